//! The static punctuator table.
//!
//! Lookup is a trie indexed by first byte: candidates sharing a first
//! byte sit together, longest lexeme first, and the first entry whose
//! text prefixes the input and whose language mask matches wins.

use once_cell::sync::Lazy;

use crate::lang::{
    LangMask, LANG_ALL, LANG_ALLC, LANG_CPP, LANG_CS, LANG_D, LANG_ECMA, LANG_JAVA, LANG_OC,
    LANG_VALA,
};
use crate::token::TokenKind;

pub struct PuncEntry {
    pub tag: &'static str,
    pub kind: TokenKind,
    pub lang: LangMask,
}

macro_rules! punc {
    ($tag:literal, $kind:ident, $lang:expr) => {
        PuncEntry {
            tag: $tag,
            kind: TokenKind::$kind,
            lang: $lang,
        }
    };
}

static PUNCTUATORS: &[PuncEntry] = &[
    punc!(">>>=", Assign, LANG_JAVA | LANG_ECMA),
    punc!("<<=", Assign, LANG_ALL),
    punc!(">>=", Assign, LANG_ALL),
    punc!(">>>", Arith, LANG_JAVA | LANG_ECMA),
    punc!("->*", Member, LANG_CPP | LANG_D),
    punc!("...", Ellipsis, LANG_ALLC),
    punc!("===", Compare, LANG_ECMA | LANG_D),
    punc!("!==", Compare, LANG_ECMA | LANG_D),
    punc!("!<>", Compare, LANG_D),
    punc!("!<=", Compare, LANG_D),
    punc!("!>=", Compare, LANG_D),
    punc!("++", IncdecAfter, LANG_ALL),
    punc!("--", IncdecAfter, LANG_ALL),
    punc!("+=", Assign, LANG_ALL),
    punc!("-=", Assign, LANG_ALL),
    punc!("*=", Assign, LANG_ALL),
    punc!("/=", Assign, LANG_ALL),
    punc!("%=", Assign, LANG_ALL),
    punc!("&=", Assign, LANG_ALL),
    punc!("|=", Assign, LANG_ALL),
    punc!("^=", Assign, LANG_ALL),
    punc!("~=", Assign, LANG_D),
    punc!("==", Compare, LANG_ALL),
    punc!("!=", Compare, LANG_ALL),
    punc!("<=", Compare, LANG_ALL),
    punc!(">=", Compare, LANG_ALL),
    punc!("<>", Compare, LANG_D),
    punc!("&&", BoolOp, LANG_ALL),
    punc!("||", BoolOp, LANG_ALL),
    punc!("<<", Arith, LANG_ALL),
    punc!(">>", Arith, LANG_ALL),
    punc!("->", Member, LANG_ALLC),
    punc!("::", DcMember, LANG_ALLC),
    punc!("[]", TSquare, LANG_ALL),
    punc!("##", Arith, LANG_ALLC),
    punc!("=>", Assign, LANG_CS | LANG_D | LANG_VALA | LANG_ECMA),
    punc!("{", BraceOpen, LANG_ALL),
    punc!("}", BraceClose, LANG_ALL),
    punc!("(", ParenOpen, LANG_ALL),
    punc!(")", ParenClose, LANG_ALL),
    punc!("[", SquareOpen, LANG_ALL),
    punc!("]", SquareClose, LANG_ALL),
    punc!("<", AngleOpen, LANG_ALL),
    punc!(">", AngleClose, LANG_ALL),
    punc!("=", Assign, LANG_ALL),
    punc!("+", Plus, LANG_ALL),
    punc!("-", Minus, LANG_ALL),
    punc!("*", Star, LANG_ALL),
    punc!("/", Arith, LANG_ALL),
    punc!("%", Arith, LANG_ALL),
    punc!("&", Amp, LANG_ALL),
    punc!("|", Arith, LANG_ALL),
    punc!("^", Caret, LANG_ALL),
    punc!("~", Inv, LANG_ALL),
    punc!("!", Not, LANG_ALL),
    punc!("?", Question, LANG_ALL),
    punc!(":", Colon, LANG_ALL),
    punc!(";", Semicolon, LANG_ALL),
    punc!(",", Comma, LANG_ALL),
    punc!(".", Member, LANG_ALL),
    punc!("#", Pound, LANG_ALL),
    punc!("@", OcAt, LANG_OC),
];

/// First-byte index: byte -> slice of candidate entries (longest first,
/// table order already guarantees that within a byte group after the
/// grouping below).
static FIRST_BYTE: Lazy<[Vec<&'static PuncEntry>; 256]> = Lazy::new(|| {
    let mut groups: [Vec<&'static PuncEntry>; 256] = std::array::from_fn(|_| Vec::new());
    for entry in PUNCTUATORS {
        groups[entry.tag.as_bytes()[0] as usize].push(entry);
    }
    for group in groups.iter_mut() {
        group.sort_by_key(|e| std::cmp::Reverse(e.tag.len()));
    }
    groups
});

/// Longest-prefix match of `input` against the table, filtered by
/// language.
pub fn find_punctuator(input: &[u8], lang: LangMask) -> Option<&'static PuncEntry> {
    let first = *input.first()?;
    FIRST_BYTE[first as usize]
        .iter()
        .copied()
        .find(|e| e.lang & lang != 0 && input.starts_with(e.tag.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::{LANG_C, LANG_JAVA};

    #[test]
    fn longest_match_wins() {
        assert_eq!(find_punctuator(b"<<= 1", LANG_C).unwrap().tag, "<<=");
        assert_eq!(find_punctuator(b"<< 1", LANG_C).unwrap().tag, "<<");
        assert_eq!(find_punctuator(b"< 1", LANG_C).unwrap().tag, "<");
    }

    #[test]
    fn language_filter_applies() {
        assert_eq!(find_punctuator(b">>> x", LANG_JAVA).unwrap().tag, ">>>");
        // C has no >>> so the first two chars match >>
        assert_eq!(find_punctuator(b">>> x", LANG_C).unwrap().tag, ">>");
        assert!(find_punctuator(b"@x", LANG_C).is_none());
    }

    #[test]
    fn kinds_are_wired() {
        assert_eq!(
            find_punctuator(b"::x", LANG_CPP).unwrap().kind,
            TokenKind::DcMember
        );
        assert_eq!(
            find_punctuator(b"[]", LANG_C).unwrap().kind,
            TokenKind::TSquare
        );
    }
}
