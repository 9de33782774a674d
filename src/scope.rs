//! Stage 5a: scope assignment.
//!
//! A single forward walk. Each named defining construct stamps its
//! name onto every chunk of the region it introduces: namespaces and
//! tag bodies contribute a bare segment, function argument parens
//! contribute `name()`, function bodies `name{}` (destructors
//! `~name{}`). A defining or declaring function chunk itself resolves
//! any leading `A::B::` chain into its path and carries its own `()` /
//! `{}` marker when the path is non-empty. Whatever is left empty
//! falls back to `<local>` (statics), `<preproc>`, or `<global>`.

use crate::chunk::{ChunkId, ChunkList, Nav};
use crate::token::{ChunkFlags, TokenKind};

pub fn assign_scope(list: &mut ChunkList) {
    let mut cur = list.head();
    while let Some(pc) = cur {
        let kind = list.kind(pc);
        let flags = list.flags(pc);
        let parent = list.parent(pc);

        match kind {
            TokenKind::Word
                if parent == TokenKind::Namespace && flags.contains(ChunkFlags::DEF) =>
            {
                if let Some(brace) = find_intro_brace(list, pc) {
                    let name = list.text(pc).to_string();
                    mark_scope(list, brace, &name);
                }
            }
            TokenKind::Type
                if matches!(
                    parent,
                    TokenKind::Class | TokenKind::Struct | TokenKind::Union | TokenKind::Enum
                ) && flags.contains(ChunkFlags::DEF) =>
            {
                if let Some(brace) = find_intro_brace(list, pc) {
                    let name = list.text(pc).to_string();
                    mark_scope(list, brace, &name);
                }
            }
            TokenKind::FuncProto => {
                mark_function_scope(list, pc, false);
            }
            TokenKind::FuncDef => {
                mark_function_scope(list, pc, true);
            }
            TokenKind::FuncClass => {
                let is_def = flags.contains(ChunkFlags::DEF);
                mark_function_scope(list, pc, is_def);
            }
            _ => {}
        }

        cur = list.next(pc, Nav::All);
    }

    // Fallbacks for everything the walk did not reach.
    let ids: Vec<ChunkId> = list.iter().collect();
    for id in ids {
        if list.get(id).scope.is_empty() {
            let flags = list.flags(id);
            let scope = if flags.contains(ChunkFlags::STATIC) {
                "<local>"
            } else if flags.contains(ChunkFlags::IN_PREPROC) {
                "<preproc>"
            } else {
                "<global>"
            };
            list.get_mut(id).scope = scope.to_string();
        }
    }
}

/// The `{` introduced by a tag/namespace name, skipping base-class
/// lists; bails at the statement end.
fn find_intro_brace(list: &ChunkList, pc: ChunkId) -> Option<ChunkId> {
    let level = list.level(pc);
    let mut cur = list.next_nnl(pc, Nav::SkipPreproc);
    while let Some(id) = cur {
        if list.level(id) == level {
            if list.kind(id) == TokenKind::BraceOpen {
                return Some(id);
            }
            if list.is_semicolon(id) {
                return None;
            }
        }
        if list.level(id) < level {
            return None;
        }
        cur = list.next_nnl(id, Nav::SkipPreproc);
    }
    None
}

/// Appends `name` to the scope of every chunk from `open` to its
/// match, inclusive.
fn mark_scope(list: &mut ChunkList, open: ChunkId, name: &str) {
    let Some(close) = list.skip_to_match(open, Nav::SkipPreproc) else {
        return;
    };
    let mut cur = Some(open);
    while let Some(id) = cur {
        let c = list.get_mut(id);
        if !c.scope.is_empty() {
            c.scope.push(':');
        }
        c.scope.push_str(name);
        if id == close {
            break;
        }
        cur = list.next(id, Nav::SkipPreproc);
    }
}

/// Scope for a function name chunk plus its argument and body regions.
fn mark_function_scope(list: &mut ChunkList, pc: ChunkId, is_def: bool) {
    let name = list.text(pc).to_string();
    let is_dtor = list.parent(pc) == TokenKind::Destructor;

    // Resolve a leading TYPE::TYPE:: chain into the path.
    let mut resolved: Vec<String> = Vec::new();
    let mut back = list.prev_nnl(pc, Nav::SkipPreproc);
    while let Some(b) = back {
        if list.kind(b) != TokenKind::DcMember {
            break;
        }
        let Some(seg) = list.prev_nnl(b, Nav::SkipPreproc) else {
            break;
        };
        if !matches!(list.kind(seg), TokenKind::Type | TokenKind::Word) {
            break;
        }
        resolved.push(list.text(seg).to_string());
        back = list.prev_nnl(seg, Nav::SkipPreproc);
    }
    resolved.reverse();

    let base = if resolved.is_empty() {
        list.get(pc).scope.clone()
    } else {
        resolved.join(":")
    };

    if !base.is_empty() {
        let deco = if is_def { "{}" } else { "()" };
        list.get_mut(pc).scope = format!("{}{}", base, deco);
    }

    // The region segment carried into args and body. Out-of-line
    // definitions carry their resolved chain so body-local records
    // keep the full path.
    let mut seg = if is_dtor {
        format!("~{}", name)
    } else {
        name
    };
    if !resolved.is_empty() {
        seg = format!("{}:{}", resolved.join(":"), seg);
    }

    let Some(next) = list.next_nnl(pc, Nav::SkipPreproc) else {
        return;
    };
    let mut after_args = None;
    if list.kind(next) == TokenKind::FParenOpen {
        let arg_seg = format!("{}()", seg);
        mark_scope(list, next, &arg_seg);
        after_args = list.skip_to_match(next, Nav::SkipPreproc);
    }

    if !is_def {
        return;
    }

    // Find the body brace. Constructor initializer lists and trailing
    // qualifiers may sit between the args and the `{`; anything that
    // reads like a fresh declaration means this header has no body
    // here (e.g. the other half of an #if/#else pair owns it).
    let level = list.level(pc);
    let mut saw_init = false;
    let mut cur = match after_args {
        Some(c) => list.next_nnl(c, Nav::SkipPreproc),
        None => Some(next),
    };
    while let Some(id) = cur {
        if list.level(id) < level {
            return;
        }
        if list.level(id) == level {
            match list.kind(id) {
                TokenKind::BraceOpen => {
                    let body_seg = format!("{}{{}}", seg);
                    mark_scope(list, id, &body_seg);
                    return;
                }
                TokenKind::ConstrColon | TokenKind::ClassColon => saw_init = true,
                TokenKind::Qualifier | TokenKind::Comma => {}
                _ if saw_init => {}
                _ => return,
            }
        }
        cur = list.next_nnl(id, Nav::SkipPreproc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::parse_chunks;
    use crate::lang::{LANG_C, LANG_CPP};

    fn scope_of(src: &str, lang: crate::lang::LangMask, name: &str) -> Vec<String> {
        let list = parse_chunks(src.as_bytes(), lang, 8, "test").unwrap();
        list.iter()
            .filter(|&id| list.text(id) == name)
            .map(|id| list.get(id).scope.clone())
            .collect()
    }

    #[test]
    fn global_fallback() {
        let scopes = scope_of("int x;", LANG_C, "x");
        assert_eq!(scopes, vec!["<global>".to_string()]);
    }

    #[test]
    fn function_body_scope() {
        let scopes = scope_of("void f(void) { int y; }", LANG_C, "y");
        assert_eq!(scopes, vec!["f{}".to_string()]);
    }

    #[test]
    fn namespace_and_class_nesting() {
        let src = "namespace N { class C { void m(); }; }";
        let scopes = scope_of(src, LANG_CPP | LANG_C, "m");
        assert_eq!(scopes, vec!["N:C()".to_string()]);
    }

    #[test]
    fn out_of_line_definition_resolves_chain() {
        let src = "namespace N { class C { void m(); }; } void N::C::m() { }";
        let scopes = scope_of(src, LANG_CPP | LANG_C, "m");
        assert_eq!(scopes, vec!["N:C()".to_string(), "N:C{}".to_string()]);
    }

    #[test]
    fn preproc_scope() {
        let scopes = scope_of("#define N 10\n", LANG_C, "N");
        assert_eq!(scopes, vec!["<preproc>".to_string()]);
    }

    #[test]
    fn struct_member_scope() {
        let scopes = scope_of("struct foo { int a; };", LANG_C, "a");
        assert_eq!(scopes, vec!["foo".to_string()]);
    }
}
