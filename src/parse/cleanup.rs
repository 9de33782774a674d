//! Stage 2 fixes that only need token order, not level info.
//!
//! Runs between the lexer and the brace tracker: merges `[]`, promotes
//! the word after a tag keyword to a type, resolves `operator`
//! symbols, marks Objective-C `@interface`-family words, detects C#
//! property accessors, and decides which `<`/`>` are template angles
//! (everything else demotes to a comparison) so that level accounting
//! downstream only ever sees real bracket pairs.

use crate::chunk::{ChunkId, ChunkList, Nav};
use crate::lang::{LangMask, LANG_CPP, LANG_CS, LANG_D, LANG_JAVA, LANG_VALA};
use crate::token::{ChunkFlags, TokenKind};

pub fn tokenize_cleanup(list: &mut ChunkList, lang: LangMask) {
    merge_tsquares(list);
    fix_simple_pairs(list, lang);
    check_templates(list, lang);
}

/// `[` directly followed by `]` collapses into one `[]` chunk.
fn merge_tsquares(list: &mut ChunkList) {
    let mut cur = list.head();
    while let Some(id) = cur {
        cur = list.next(id, Nav::All);
        if list.kind(id) == TokenKind::SquareOpen {
            if let Some(next) = list.next(id, Nav::All) {
                if list.kind(next) == TokenKind::SquareClose {
                    let col_end = list.get(next).col_end;
                    let c = list.get_mut(id);
                    c.kind = TokenKind::TSquare;
                    c.text = "[]".to_string();
                    c.col_end = col_end;
                    cur = list.next(next, Nav::All);
                    list.remove(next);
                }
            }
        }
    }
}

fn fix_simple_pairs(list: &mut ChunkList, lang: LangMask) {
    let mut cur = list.head();
    while let Some(id) = cur {
        cur = list.next(id, Nav::All);
        let kind = list.kind(id);
        let next = list.next_nnl(id, Nav::SkipPreproc);

        match kind {
            // The word after struct/union/enum/class is a type name.
            TokenKind::Struct | TokenKind::Union | TokenKind::Enum | TokenKind::Class => {
                if let Some(n) = next {
                    match list.kind(n) {
                        TokenKind::Word => list.set_kind(n, TokenKind::Type),
                        // enum class / enum struct (C++11 scoped enum)
                        TokenKind::Class | TokenKind::Struct if kind == TokenKind::Enum => {
                            list.set_kind(n, TokenKind::EnumClass);
                            if let Some(n2) = list.next_nnl(n, Nav::SkipPreproc) {
                                if list.kind(n2) == TokenKind::Word {
                                    list.set_kind(n2, TokenKind::Type);
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            // `operator` plus the following symbol(s) up to the paren.
            TokenKind::Operator => {
                let mut walk = next;
                while let Some(n) = walk {
                    if list.kind(n) == TokenKind::ParenOpen
                        || list.kind(n) == TokenKind::FParenOpen
                        || list.is_newline(n)
                    {
                        break;
                    }
                    if list.flags(n).contains(ChunkFlags::PUNCTUATOR) {
                        list.set_kind(n, TokenKind::OperatorVal);
                    }
                    list.set_parent(n, TokenKind::Operator);
                    walk = list.next_nnl(n, Nav::SkipPreproc);
                }
            }
            // Forward protocol declarations run through the class
            // handler, which bails on the semicolon.
            TokenKind::OcProtocol => {
                if let Some(n) = next {
                    if list.kind(n) == TokenKind::Word || list.kind(n) == TokenKind::Type {
                        list.set_kind(id, TokenKind::OcClass);
                        list.set_parent(id, TokenKind::OcProtocol);
                    }
                }
            }
            // C# accessors: get/set directly before `{` or `;`.
            TokenKind::Word if lang & (LANG_CS | LANG_VALA) != 0 => {
                if list.text(id) == "get" || list.text(id) == "set" {
                    if let Some(n) = next {
                        let prev_ok = list
                            .prev_nnl(id, Nav::SkipPreproc)
                            .map(|p| {
                                matches!(
                                    list.kind(p),
                                    TokenKind::BraceOpen
                                        | TokenKind::BraceClose
                                        | TokenKind::Semicolon
                                )
                            })
                            .unwrap_or(false);
                        if prev_ok && list.kind(n) == TokenKind::BraceOpen {
                            list.set_kind(id, TokenKind::Getset);
                        } else if prev_ok && list.kind(n) == TokenKind::Semicolon {
                            list.set_kind(id, TokenKind::GetsetEmpty);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Decides template angles. A `<` survives as [`TokenKind::AngleOpen`]
/// only when it opens a plausible template argument list; every other
/// `<`/`>` becomes [`TokenKind::Compare`].
fn check_templates(list: &mut ChunkList, lang: LangMask) {
    let templates_possible = lang & (LANG_CPP | LANG_CS | LANG_JAVA | LANG_D | LANG_VALA) != 0;

    let mut cur = list.head();
    while let Some(id) = cur {
        cur = list.next(id, Nav::All);
        if list.kind(id) != TokenKind::AngleOpen {
            continue;
        }
        if !templates_possible {
            list.set_kind(id, TokenKind::Compare);
            continue;
        }

        let prev = list.prev_nnl(id, Nav::SkipPreproc);
        let after_template_kw = prev.map(|p| list.kind(p) == TokenKind::Template).unwrap_or(false);
        let after_name = prev
            .map(|p| matches!(list.kind(p), TokenKind::Word | TokenKind::Type))
            .unwrap_or(false);

        if (after_template_kw || after_name) && scan_template_args(list, id) {
            // scan_template_args retagged the pair; nested opens get
            // their own pass as the walk continues.
        } else {
            list.set_kind(id, TokenKind::Compare);
        }
    }

    // Any '>' that never matched an accepted '<'.
    let mut cur = list.head();
    while let Some(id) = cur {
        cur = list.next(id, Nav::All);
        if list.kind(id) == TokenKind::AngleClose && list.parent(id) != TokenKind::Template {
            list.set_kind(id, TokenKind::Compare);
        }
    }
}

/// Forward scan from an `<`; accepts only token kinds that can appear
/// in a template argument list. On success both angles get
/// `parent = Template`. `>>` closers are split in place.
fn scan_template_args(list: &mut ChunkList, open: ChunkId) -> bool {
    const SCAN_LIMIT: usize = 256;

    let mut depth = 1i32;
    let mut paren_depth = 0i32;
    let mut steps = 0usize;
    let mut closes: Vec<ChunkId> = Vec::new();

    let mut cur = list.next_nnl(open, Nav::SkipPreproc);
    while let Some(id) = cur {
        steps += 1;
        if steps > SCAN_LIMIT {
            return false;
        }
        let kind = list.kind(id);
        match kind {
            TokenKind::AngleOpen => depth += 1,
            TokenKind::AngleClose => {
                depth -= 1;
                closes.push(id);
                if depth == 0 {
                    break;
                }
            }
            // ">>" closing two levels at once (C++11).
            TokenKind::Arith if list.text(id) == ">>" && depth >= 2 && paren_depth == 0 => {
                let (line, col) = {
                    let c = list.get(id);
                    (c.line, c.col)
                };
                {
                    let c = list.get_mut(id);
                    c.kind = TokenKind::AngleClose;
                    c.text = ">".to_string();
                    c.col_end = col + 1;
                }
                let mut second = crate::chunk::Chunk::new(TokenKind::AngleClose, ">", line, col + 1);
                second.col_end = col + 2;
                second.flags = ChunkFlags::PUNCTUATOR;
                let sid = list.insert_after(id, second);
                closes.push(id);
                closes.push(sid);
                depth -= 2;
                if depth <= 0 {
                    break;
                }
            }
            TokenKind::ParenOpen => paren_depth += 1,
            TokenKind::ParenClose => {
                if paren_depth == 0 {
                    return false;
                }
                paren_depth -= 1;
            }
            // Anything statement-like ends the idea of a template.
            TokenKind::Semicolon
            | TokenKind::VSemicolon
            | TokenKind::BraceOpen
            | TokenKind::BraceClose
            | TokenKind::Str
            | TokenKind::StrMulti
            | TokenKind::BoolOp
            | TokenKind::Assign
            | TokenKind::Question => return false,
            _ if paren_depth > 0 => {}
            TokenKind::Word
            | TokenKind::Type
            | TokenKind::Number
            | TokenKind::NumberFp
            | TokenKind::Comma
            | TokenKind::Star
            | TokenKind::Amp
            | TokenKind::Minus
            | TokenKind::Plus
            | TokenKind::Qualifier
            | TokenKind::DcMember
            | TokenKind::Member
            | TokenKind::Ellipsis
            | TokenKind::Typename
            | TokenKind::Class
            | TokenKind::Struct
            | TokenKind::Sizeof
            | TokenKind::This
            | TokenKind::SquareOpen
            | TokenKind::SquareClose
            | TokenKind::TSquare => {}
            _ => return false,
        }
        cur = list.next_nnl(id, Nav::SkipPreproc);
    }

    if depth > 0 {
        return false;
    }

    list.set_parent(open, TokenKind::Template);
    if let Some(&last) = closes.last() {
        list.set_parent(last, TokenKind::Template);
    }
    // Inner closers pair with inner opens; mark them so the final
    // sweep leaves them alone.
    for &c in &closes {
        list.set_parent(c, TokenKind::Template);
    }
    // Mark inner opens too.
    let mut cur = list.next_nnl(open, Nav::SkipPreproc);
    while let Some(id) = cur {
        if Some(id) == closes.last().copied() {
            break;
        }
        if list.kind(id) == TokenKind::AngleOpen {
            list.set_parent(id, TokenKind::Template);
        }
        cur = list.next_nnl(id, Nav::SkipPreproc);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::{LANG_C, LANG_CPP};
    use crate::lex::tokenize;

    fn prep(src: &str, lang: LangMask) -> ChunkList {
        let mut list = ChunkList::new();
        tokenize(src.as_bytes(), lang, 8, "test", &mut list).unwrap();
        tokenize_cleanup(&mut list, lang);
        list
    }

    fn kinds_texts(list: &ChunkList) -> Vec<(TokenKind, String)> {
        list.iter()
            .filter(|&id| !list.is_newline(id))
            .map(|id| (list.kind(id), list.text(id).to_string()))
            .collect()
    }

    #[test]
    fn empty_square_pair_merges() {
        let list = prep("int a[] ;", LANG_C);
        assert!(kinds_texts(&list).contains(&(TokenKind::TSquare, "[]".to_string())));
    }

    #[test]
    fn word_after_struct_becomes_type() {
        let list = prep("struct foo x;", LANG_C);
        assert!(kinds_texts(&list).contains(&(TokenKind::Type, "foo".to_string())));
    }

    #[test]
    fn template_angles_survive() {
        let list = prep("vector<int> v;", LANG_CPP | LANG_C);
        let kt = kinds_texts(&list);
        assert!(kt.contains(&(TokenKind::AngleOpen, "<".to_string())));
        assert!(kt.contains(&(TokenKind::AngleClose, ">".to_string())));
    }

    #[test]
    fn comparison_angles_demote() {
        let list = prep("if (a < b && c > d) { }", LANG_CPP | LANG_C);
        let kt = kinds_texts(&list);
        assert!(!kt.contains(&(TokenKind::AngleOpen, "<".to_string())));
        assert!(kt.contains(&(TokenKind::Compare, "<".to_string())));
        assert!(kt.contains(&(TokenKind::Compare, ">".to_string())));
    }

    #[test]
    fn nested_template_shift_close_splits() {
        let list = prep("vector<vector<int>> v;", LANG_CPP | LANG_C);
        let closes = kinds_texts(&list)
            .iter()
            .filter(|(k, t)| *k == TokenKind::AngleClose && t == ">")
            .count();
        assert_eq!(closes, 2);
    }

    #[test]
    fn plain_less_than_in_c() {
        let list = prep("x = a < b;", LANG_C);
        assert!(kinds_texts(&list).contains(&(TokenKind::Compare, "<".to_string())));
    }
}
