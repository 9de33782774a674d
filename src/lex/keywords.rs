//! The static keyword table.
//!
//! Entries are sorted by lexeme for binary search and carry the
//! language mask they apply to. An entry with [`FLAG_PP`] only matches
//! inside a preprocessor directive; `defined` additionally matches in
//! `#if`/`#elif` bodies. Duplicate lexemes with different masks are
//! allowed (`else` vs `#else`, `new` in Pawn vs C++).

use crate::lang::{
    LangMask, FLAG_PP, LANG_ALL, LANG_ALLC, LANG_C, LANG_CPP, LANG_CS, LANG_D, LANG_ECMA,
    LANG_JAVA, LANG_OC, LANG_PAWN, LANG_VALA,
};
use crate::token::TokenKind;

pub struct KeywordEntry {
    pub tag: &'static str,
    pub kind: TokenKind,
    pub lang: LangMask,
}

macro_rules! kw {
    ($tag:literal, $kind:ident, $lang:expr) => {
        KeywordEntry {
            tag: $tag,
            kind: TokenKind::$kind,
            lang: $lang,
        }
    };
}

/// Sorted by `tag`. `keywords_are_sorted` pins the ordering.
static KEYWORDS: &[KeywordEntry] = &[
    kw!("@catch", Catch, LANG_OC),
    kw!("@dynamic", Qualifier, LANG_OC),
    kw!("@end", OcEnd, LANG_OC),
    kw!("@finally", Finally, LANG_OC),
    kw!("@implementation", OcClass, LANG_OC),
    kw!("@interface", OcClass, LANG_OC),
    kw!("@private", Private, LANG_OC),
    kw!("@property", OcProperty, LANG_OC),
    kw!("@protected", Private, LANG_OC),
    kw!("@protocol", OcProtocol, LANG_OC),
    kw!("@public", Private, LANG_OC),
    kw!("@selector", OcSel, LANG_OC),
    kw!("@synthesize", Qualifier, LANG_OC),
    kw!("@throw", Throw, LANG_OC),
    kw!("@try", Try, LANG_OC),
    kw!("_Bool", Type, LANG_C),
    kw!("__attribute__", Attribute, LANG_C | LANG_CPP | LANG_OC),
    kw!("abstract", Qualifier, LANG_CS | LANG_D | LANG_JAVA | LANG_VALA | LANG_ECMA),
    kw!("alias", Typedef, LANG_D),
    kw!("align", Align, LANG_D),
    kw!("assert", Assert, LANG_D | LANG_JAVA | LANG_PAWN),
    kw!("auto", Qualifier, LANG_C | LANG_CPP | LANG_OC),
    kw!("base", Base, LANG_CS | LANG_VALA),
    kw!("bool", Type, LANG_ALLC),
    kw!("boolean", Type, LANG_JAVA | LANG_ECMA),
    kw!("break", Break, LANG_ALL),
    kw!("byte", Type, LANG_CS | LANG_D | LANG_JAVA | LANG_ECMA),
    kw!("case", Case, LANG_ALL),
    kw!("cast", DCast, LANG_D),
    kw!("catch", Catch, LANG_CPP | LANG_CS | LANG_D | LANG_JAVA | LANG_VALA | LANG_ECMA),
    kw!("char", Type, LANG_ALLC),
    kw!("checked", Qualifier, LANG_CS),
    kw!("class", Class, LANG_CPP | LANG_CS | LANG_D | LANG_JAVA | LANG_OC | LANG_VALA | LANG_ECMA),
    kw!("const", Qualifier, LANG_ALL),
    kw!("const_cast", TypeCast, LANG_CPP),
    kw!("constexpr", Qualifier, LANG_CPP),
    kw!("continue", Continue, LANG_ALL),
    kw!("dchar", Type, LANG_D),
    kw!("decimal", Type, LANG_CS),
    kw!("default", Default, LANG_ALL),
    kw!("define", PpDefine, LANG_ALL | FLAG_PP),
    kw!("defined", PpDefined, LANG_ALLC | FLAG_PP),
    kw!("delegate", Delegate, LANG_CS | LANG_D | LANG_VALA),
    kw!("delete", Delete, LANG_CPP | LANG_D | LANG_ECMA),
    kw!("deprecated", Qualifier, LANG_D),
    kw!("do", Do, LANG_ALL),
    kw!("double", Type, LANG_ALLC),
    kw!("dynamic_cast", TypeCast, LANG_CPP),
    kw!("elif", PpElse, LANG_ALLC | FLAG_PP),
    kw!("else", Else, LANG_ALL),
    kw!("else", PpElse, LANG_ALLC | FLAG_PP),
    kw!("endif", PpEndif, LANG_ALLC | FLAG_PP),
    kw!("endregion", PpRegion, LANG_ALL | FLAG_PP),
    kw!("enum", Enum, LANG_ALL),
    kw!("error", PpError, LANG_PAWN | FLAG_PP),
    kw!("explicit", Qualifier, LANG_CPP | LANG_CS),
    kw!("extends", Qualifier, LANG_JAVA | LANG_ECMA),
    kw!("extern", Extern, LANG_ALLC),
    kw!("final", Qualifier, LANG_CPP | LANG_D | LANG_JAVA | LANG_ECMA),
    kw!("finally", Finally, LANG_CS | LANG_D | LANG_JAVA | LANG_ECMA),
    kw!("fixed", Qualifier, LANG_CS),
    kw!("float", Type, LANG_ALLC),
    kw!("for", For, LANG_ALL),
    kw!("foreach", For, LANG_CS | LANG_D | LANG_VALA),
    kw!("foreach_reverse", For, LANG_D),
    kw!("forward", Qualifier, LANG_PAWN),
    kw!("friend", Friend, LANG_CPP),
    kw!("function", Type, LANG_D | LANG_ECMA),
    kw!("goto", Goto, LANG_ALL),
    kw!("id", Type, LANG_OC),
    kw!("if", If, LANG_ALL),
    kw!("if", PpIf, LANG_ALLC | FLAG_PP),
    kw!("ifdef", PpIf, LANG_ALLC | FLAG_PP),
    kw!("ifndef", PpIf, LANG_ALLC | FLAG_PP),
    kw!("implements", Qualifier, LANG_JAVA | LANG_ECMA),
    kw!("import", Import, LANG_D | LANG_JAVA | LANG_ECMA),
    kw!("import", PpInclude, LANG_OC | FLAG_PP),
    kw!("include", PpInclude, LANG_ALLC | FLAG_PP),
    kw!("inline", Qualifier, LANG_C | LANG_CPP | LANG_OC),
    kw!("inout", Qualifier, LANG_D),
    kw!("instanceof", Compare, LANG_JAVA | LANG_ECMA),
    kw!("int", Type, LANG_ALLC),
    kw!("interface", Class, LANG_CS | LANG_D | LANG_JAVA | LANG_VALA | LANG_ECMA),
    kw!("internal", Qualifier, LANG_CS),
    kw!("invariant", Invariant, LANG_D),
    kw!("line", PpLine, LANG_ALLC | FLAG_PP),
    kw!("lock", Qualifier, LANG_CS | LANG_VALA),
    kw!("long", Type, LANG_ALLC),
    kw!("mutable", Qualifier, LANG_CPP),
    kw!("namespace", Namespace, LANG_CPP | LANG_CS | LANG_D | LANG_VALA),
    kw!("native", Qualifier, LANG_JAVA | LANG_PAWN),
    kw!("new", New, LANG_CPP | LANG_CS | LANG_D | LANG_JAVA | LANG_VALA | LANG_ECMA),
    kw!("new", Type, LANG_PAWN),
    kw!("object", Type, LANG_CS | LANG_VALA),
    kw!("operator", Operator, LANG_CPP | LANG_CS),
    kw!("out", Qualifier, LANG_CS | LANG_D | LANG_VALA),
    kw!("override", Qualifier, LANG_CS | LANG_D | LANG_VALA),
    kw!("params", Qualifier, LANG_CS | LANG_VALA),
    kw!("pragma", PpPragma, LANG_ALLC | FLAG_PP),
    kw!("private", Private, LANG_ALLC),
    kw!("protected", Private, LANG_ALLC),
    kw!("public", Private, LANG_ALLC),
    kw!("public", Qualifier, LANG_PAWN),
    kw!("readonly", Qualifier, LANG_CS),
    kw!("real", Type, LANG_D),
    kw!("region", PpRegion, LANG_ALL | FLAG_PP),
    kw!("register", Qualifier, LANG_C | LANG_CPP | LANG_OC),
    kw!("reinterpret_cast", TypeCast, LANG_CPP),
    kw!("restrict", Qualifier, LANG_C | LANG_CPP | LANG_OC),
    kw!("return", Return, LANG_ALL),
    kw!("sbyte", Type, LANG_CS),
    kw!("sealed", Qualifier, LANG_CS),
    kw!("self", This, LANG_OC),
    kw!("short", Type, LANG_ALLC),
    kw!("signed", Type, LANG_C | LANG_CPP | LANG_OC),
    kw!("sizeof", Sizeof, LANG_C | LANG_CPP | LANG_CS | LANG_OC | LANG_VALA | LANG_PAWN),
    kw!("stackalloc", Qualifier, LANG_CS),
    kw!("state", State, LANG_PAWN),
    kw!("static", Qualifier, LANG_ALL),
    kw!("static_cast", TypeCast, LANG_CPP),
    kw!("stock", Qualifier, LANG_PAWN),
    kw!("strictfp", Qualifier, LANG_JAVA),
    kw!("string", Type, LANG_CS | LANG_D | LANG_VALA),
    kw!("struct", Struct, LANG_C | LANG_CPP | LANG_CS | LANG_D | LANG_OC | LANG_VALA),
    kw!("super", Base, LANG_D | LANG_JAVA | LANG_ECMA),
    kw!("switch", Switch, LANG_ALL),
    kw!("synchronized", Qualifier, LANG_D | LANG_JAVA | LANG_ECMA),
    kw!("tagof", Sizeof, LANG_PAWN),
    kw!("template", Template, LANG_CPP | LANG_D),
    kw!("this", This, LANG_CPP | LANG_CS | LANG_D | LANG_JAVA | LANG_VALA | LANG_ECMA),
    kw!("throw", Throw, LANG_CPP | LANG_CS | LANG_D | LANG_JAVA | LANG_VALA | LANG_ECMA),
    kw!("throws", Qualifier, LANG_JAVA | LANG_ECMA | LANG_PAWN),
    kw!("transient", Qualifier, LANG_JAVA | LANG_ECMA),
    kw!("try", Try, LANG_CPP | LANG_CS | LANG_D | LANG_JAVA | LANG_VALA | LANG_ECMA),
    kw!("typedef", Typedef, LANG_C | LANG_CPP | LANG_OC),
    kw!("typename", Typename, LANG_CPP),
    kw!("typeof", Sizeof, LANG_C | LANG_CPP | LANG_CS | LANG_D | LANG_VALA | LANG_ECMA),
    kw!("ubyte", Type, LANG_D),
    kw!("ucent", Type, LANG_D),
    kw!("uint", Type, LANG_CS | LANG_D | LANG_VALA),
    kw!("ulong", Type, LANG_CS | LANG_D | LANG_VALA),
    kw!("unchecked", Qualifier, LANG_CS),
    kw!("undef", PpUndef, LANG_ALLC | FLAG_PP),
    kw!("union", Union, LANG_C | LANG_CPP | LANG_D | LANG_OC),
    kw!("unsafe", Qualifier, LANG_CS),
    kw!("unsigned", Type, LANG_C | LANG_CPP | LANG_OC),
    kw!("ushort", Type, LANG_CS | LANG_D | LANG_VALA),
    kw!("using", Using, LANG_CPP | LANG_CS | LANG_VALA),
    kw!("var", Qualifier, LANG_CS | LANG_VALA | LANG_ECMA),
    kw!("version", DVersion, LANG_D),
    kw!("virtual", Qualifier, LANG_CPP | LANG_CS | LANG_VALA),
    kw!("void", Type, LANG_ALLC),
    kw!("volatile", Qualifier, LANG_C | LANG_CPP | LANG_CS | LANG_JAVA | LANG_OC | LANG_ECMA),
    kw!("warning", PpWarning, LANG_ALLC | FLAG_PP),
    kw!("wchar", Type, LANG_D),
    kw!("wchar_t", Type, LANG_C | LANG_CPP | LANG_OC),
    kw!("where", Qualifier, LANG_CS),
    kw!("while", While, LANG_ALL),
];

/// The preprocessor position of a lookup: outside any directive, at the
/// directive-name slot right after `#`, or inside a directive body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpPos {
    None,
    DirectiveName,
    InIf,
    InOther,
}

/// Looks up `word`; returns [`TokenKind::Word`] on a miss.
pub fn find_keyword(word: &str, pp: PpPos, lang: LangMask) -> TokenKind {
    let Ok(hit) = KEYWORDS.binary_search_by(|e| e.tag.cmp(word)) else {
        return TokenKind::Word;
    };

    // Walk to the first entry with this tag, then scan the run.
    let mut first = hit;
    while first > 0 && KEYWORDS[first - 1].tag == word {
        first -= 1;
    }

    let mut fallback = TokenKind::Word;
    for entry in KEYWORDS[first..].iter().take_while(|e| e.tag == word) {
        if entry.lang & lang == 0 {
            continue;
        }
        let is_pp_entry = entry.lang & FLAG_PP != 0;
        match pp {
            PpPos::DirectiveName => {
                if is_pp_entry {
                    return entry.kind;
                }
            }
            PpPos::InIf => {
                // `defined` is the one PP keyword legal mid-directive.
                if is_pp_entry && entry.kind == TokenKind::PpDefined {
                    return entry.kind;
                }
                if !is_pp_entry {
                    fallback = entry.kind;
                }
            }
            PpPos::InOther | PpPos::None => {
                if !is_pp_entry {
                    fallback = entry.kind;
                }
            }
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_sorted() {
        for pair in KEYWORDS.windows(2) {
            assert!(
                pair[0].tag <= pair[1].tag,
                "table out of order at {:?}",
                pair[1].tag
            );
        }
    }

    #[test]
    fn language_filter_applies() {
        assert_eq!(find_keyword("class", PpPos::None, LANG_C), TokenKind::Word);
        assert_eq!(
            find_keyword("class", PpPos::None, LANG_CPP),
            TokenKind::Class
        );
        assert_eq!(
            find_keyword("new", PpPos::None, LANG_PAWN),
            TokenKind::Type
        );
        assert_eq!(find_keyword("new", PpPos::None, LANG_CPP), TokenKind::New);
    }

    #[test]
    fn pp_entries_need_directive_position() {
        assert_eq!(
            find_keyword("define", PpPos::DirectiveName, LANG_C),
            TokenKind::PpDefine
        );
        assert_eq!(find_keyword("define", PpPos::None, LANG_C), TokenKind::Word);
        // #else resolves to the PP kind, plain else to the statement kind.
        assert_eq!(
            find_keyword("else", PpPos::DirectiveName, LANG_C),
            TokenKind::PpElse
        );
        assert_eq!(find_keyword("else", PpPos::None, LANG_C), TokenKind::Else);
    }

    #[test]
    fn defined_matches_inside_if_body() {
        assert_eq!(
            find_keyword("defined", PpPos::InIf, LANG_C),
            TokenKind::PpDefined
        );
        // ...but normal keywords keep their kinds inside define bodies.
        assert_eq!(find_keyword("if", PpPos::InOther, LANG_C), TokenKind::If);
    }
}
