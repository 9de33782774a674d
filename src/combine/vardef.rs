//! Variable definitions, struct bodies, lvalues, and `#define` body
//! expression marking.

use tracing::debug;

use crate::chunk::{Chunk, ChunkId, ChunkList, Nav};
use crate::lang::LangMask;
use crate::token::{ChunkFlags, TokenKind};

use super::{make_type, skip_attribute_next, skip_template_next};

/// Skips to the start of the next statement.
fn skip_to_next_statement(list: &ChunkList, pc: Option<ChunkId>) -> Option<ChunkId> {
    let mut cur = pc;
    while let Some(id) = cur {
        if list.is_semicolon(id)
            || matches!(list.kind(id), TokenKind::BraceOpen | TokenKind::BraceClose)
        {
            break;
        }
        cur = list.next_nnl(id, Nav::All);
    }
    cur
}

/// Skips to the comma or semicolon ending the expression at the same
/// level.
fn skip_expression(list: &ChunkList, start: ChunkId) -> Option<ChunkId> {
    let level = list.level(start);
    let mut cur = Some(start);
    while let Some(id) = cur {
        if list.level(id) < level {
            return Some(id);
        }
        if list.level(id) == level
            && (list.is_semicolon(id) || list.kind(id) == TokenKind::Comma)
        {
            return Some(id);
        }
        cur = list.next_nnl(id, Nav::All);
    }
    None
}

/// On the first word of a variable definition: mark the names with
/// VAR_DEF/VAR_DECL, stars as pointer types. Skips `[...]` and `=`
/// initializers, stops at the `;`.
pub(crate) fn mark_variable_definition(
    list: &mut ChunkList,
    start: ChunkId,
    flags: ChunkFlags,
) -> Option<ChunkId> {
    let level = list.level(start);
    let mut cur = Some(start);
    debug!("mark_variable_definition: '{}'", list.text(start));

    while let Some(pc) = cur {
        if list.is_semicolon(pc) || list.level(pc) != level {
            break;
        }
        let kind = list.kind(pc);
        if kind == TokenKind::Word || kind == TokenKind::FuncCtorVar {
            if !list.flags(pc).contains(ChunkFlags::IN_ENUM) {
                list.add_flags(pc, flags);
            }
        } else if list.is_star(pc) {
            list.set_kind(pc, TokenKind::PtrType);
        } else if list.is_addr(pc) {
            list.set_kind(pc, TokenKind::Byref);
        } else if matches!(kind, TokenKind::SquareOpen | TokenKind::Assign) {
            cur = skip_expression(list, pc);
            continue;
        }
        cur = list.next_nnl(pc, Nav::All);
    }
    cur
}

/// A possible variable definition at a statement start: accumulate the
/// type-ish chunks, decide, and mark. Returns where to resume.
pub(crate) fn fix_var_def(
    list: &mut ChunkList,
    _lang: LangMask,
    start: ChunkId,
) -> Option<ChunkId> {
    let mut cs: Vec<ChunkId> = Vec::new();
    let mut flags = ChunkFlags::VAR_DEF;
    let mut pc = Some(start);

    // Scan for words and types and stars oh my!
    while let Some(id) = pc {
        let kind = list.kind(id);
        let type_ish = matches!(
            kind,
            TokenKind::Type
                | TokenKind::Word
                | TokenKind::Qualifier
                | TokenKind::Extern
                | TokenKind::DcMember
                | TokenKind::Member
        ) || list.is_addr(id)
            || list.is_star(id);
        if !type_ish {
            break;
        }
        cs.push(id);

        if kind == TokenKind::Extern {
            flags = flags - ChunkFlags::VAR_DEF;
            flags |= ChunkFlags::VAR_DECL;
        } else if kind == TokenKind::Qualifier && list.is_str(id, "static") {
            flags |= ChunkFlags::STATIC;
        }

        pc = list.next_nnl(id, Nav::All);
        pc = skip_template_next(list, pc);
        pc = skip_attribute_next(list, pc);
    }
    let end = pc?;

    // Function defs are handled elsewhere.
    if cs.len() <= 1
        || matches!(
            list.kind(end),
            TokenKind::FuncDef | TokenKind::FuncProto | TokenKind::FuncClass | TokenKind::Operator
        )
    {
        return skip_to_next_statement(list, Some(end));
    }

    let mut ref_idx = cs.len() - 1;

    // "char *Engine::name" style: resolve the :: chain.
    if cs.len() >= 3
        && matches!(
            list.kind(cs[cs.len() - 2]),
            TokenKind::Member | TokenKind::DcMember
        )
    {
        let mut idx = (cs.len() - 2) as isize;
        while idx > 0 {
            let sep = cs[idx as usize];
            if !matches!(list.kind(sep), TokenKind::Member | TokenKind::DcMember) {
                break;
            }
            idx -= 1;
            let name = cs[idx as usize];
            if !matches!(list.kind(name), TokenKind::Word | TokenKind::Type) {
                break;
            }
            if list.kind(sep) == TokenKind::DcMember {
                make_type(list, name);
            }
            idx -= 1;
        }
        ref_idx = (idx + 1) as usize;
    }

    // No type part found.
    if ref_idx == 0 {
        return skip_to_next_statement(list, Some(end));
    }

    for &id in &cs[..cs.len() - 1] {
        make_type(list, id);
        list.add_flags(id, ChunkFlags::VAR_TYPE);
    }

    mark_variable_definition(list, cs[cs.len() - 1], flags);
    if list.kind(end) == TokenKind::Comma {
        return list.next_nnl(end, Nav::All);
    }
    skip_to_next_statement(list, Some(end))
}

/// Skips D's `align(n)` and an optional colon.
fn skip_align(list: &ChunkList, start: ChunkId) -> Option<ChunkId> {
    let mut pc = Some(start);
    if list.kind(start) == TokenKind::Align {
        pc = list.next_nnl(start, Nav::All);
        if let Some(p) = pc {
            if list.kind(p) == TokenKind::ParenOpen {
                let close = list.next_of_kind(p, TokenKind::ParenClose, list.level(p), Nav::All)?;
                pc = list.next_nnl(close, Nav::All);
                if let Some(p2) = pc {
                    if list.kind(p2) == TokenKind::Colon {
                        pc = list.next_nnl(p2, Nav::All);
                    }
                }
            }
        }
    }
    pc
}

/// Walks a struct/union body marking variable definitions; methods are
/// handled elsewhere.
pub(crate) fn mark_struct_union_body(list: &mut ChunkList, lang: LangMask, start: ChunkId) {
    let start_level = list.level(start);
    let mut pc = Some(start);

    while let Some(mut id) = pc {
        if list.level(id) < start_level
            || (list.level(id) == start_level && list.kind(id) == TokenKind::BraceClose && id != start)
        {
            break;
        }
        if matches!(
            list.kind(id),
            TokenKind::BraceOpen | TokenKind::BraceClose | TokenKind::Semicolon
        ) || id == start
        {
            match list.next_nnl(id, Nav::All) {
                Some(n) => id = n,
                None => break,
            }
            if list.level(id) < start_level
                || (list.level(id) == start_level && list.kind(id) == TokenKind::BraceClose)
            {
                break;
            }
        }
        pc = if list.kind(id) == TokenKind::Align {
            skip_align(list, id)
        } else {
            fix_var_def(list, lang, id)
        };
        if pc == Some(id) {
            // No progress: step to avoid spinning on odd input.
            pc = list.next_nnl(id, Nav::All);
        }
    }
}

/// Backwards from an assignment, everything up to the statement
/// boundary is an lvalue.
pub(crate) fn mark_lvalue(list: &mut ChunkList, pc: ChunkId) {
    if list.flags(pc).contains(ChunkFlags::IN_PREPROC) {
        return;
    }
    let level = list.level(pc);
    let mut prev = list.prev_nnl(pc, Nav::All);
    while let Some(p) = prev {
        if list.level(p) < level
            || matches!(list.kind(p), TokenKind::Assign | TokenKind::Comma | TokenKind::BoolOp)
            || list.is_semicolon(p)
            || list.is_str(p, "(")
            || list.is_str(p, "{")
            || list.is_str(p, "[")
            || list.flags(p).contains(ChunkFlags::IN_PREPROC)
        {
            break;
        }
        list.add_flags(p, ChunkFlags::LVALUE);
        if list.level(p) == level && list.is_str(p, "&") {
            make_type(list, p);
        }
        prev = list.prev_nnl(p, Nav::All);
    }
}

/// Marks expression starts inside `#define` bodies, so the re-labeler
/// treats macro bodies like code.
pub(crate) fn mark_define_expressions(list: &mut ChunkList) {
    let mut in_define = false;
    let mut first = true;
    let mut prev: Option<ChunkId> = None;

    let mut cur = list.head();
    while let Some(pc) = cur {
        let kind = list.kind(pc);
        if !in_define {
            if matches!(kind, TokenKind::PpDefine | TokenKind::PpIf | TokenKind::PpElse) {
                in_define = true;
                first = true;
            }
        } else if !list.flags(pc).contains(ChunkFlags::IN_PREPROC) || kind == TokenKind::Preproc {
            in_define = false;
        } else if kind != TokenKind::Macro {
            let pk = prev.map(|p| list.kind(p)).unwrap_or(TokenKind::None);
            let starts = first
                || matches!(
                    pk,
                    TokenKind::ParenOpen
                        | TokenKind::FParenOpen
                        | TokenKind::SParenOpen
                        | TokenKind::Arith
                        | TokenKind::Caret
                        | TokenKind::Assign
                        | TokenKind::Compare
                        | TokenKind::Return
                        | TokenKind::Goto
                        | TokenKind::Continue
                        | TokenKind::BraceOpen
                        | TokenKind::Comma
                        | TokenKind::Colon
                        | TokenKind::Question
                )
                || prev.map(|p| list.is_semicolon(p)).unwrap_or(false);
            if starts {
                list.add_flags(pc, ChunkFlags::EXPR_START);
                first = false;
            }
        }
        prev = Some(pc);
        cur = list.next(pc, Nav::All);
    }
}

/// Inserts a virtual semicolon after `pc` (Pawn statements, D enums).
pub(crate) fn add_vsemi_after(list: &mut ChunkList, pc: ChunkId) -> ChunkId {
    let (line, col, level, brace_level, pp_level, flags) = {
        let c = list.get(pc);
        (c.line, c.col_end, c.level, c.brace_level, c.pp_level, c.flags.copy_part())
    };
    let mut vs = Chunk::new(TokenKind::VSemicolon, "", line, col);
    vs.level = level;
    vs.brace_level = brace_level;
    vs.pp_level = pp_level;
    vs.flags = flags;
    list.insert_after(pc, vs)
}

/// Pawn ends statements at line ends. Conservatively insert virtual
/// semicolons where a line inside a function body ends a statement and
/// the next line starts a fresh one.
pub(crate) fn pawn_add_virtual_semicolons(list: &mut ChunkList) {
    let ids: Vec<ChunkId> = list.iter().collect();
    for id in ids {
        if !list.is_newline(id) || list.is_preproc(id) {
            continue;
        }
        let Some(prev) = list.prev_nnl(id, Nav::All) else {
            continue;
        };
        let Some(next) = list.next_nnl(id, Nav::All) else {
            continue;
        };
        let c = list.get(prev);
        if c.brace_level == 0 || c.level != c.brace_level {
            continue;
        }
        if list.is_semicolon(prev) {
            continue;
        }
        let ends = matches!(
            list.kind(prev),
            TokenKind::Word
                | TokenKind::Number
                | TokenKind::NumberFp
                | TokenKind::Str
                | TokenKind::ParenClose
                | TokenKind::SParenClose
                | TokenKind::FParenClose
                | TokenKind::SquareClose
                | TokenKind::IncdecAfter
        );
        let starts = matches!(
            list.kind(next),
            TokenKind::Word
                | TokenKind::Type
                | TokenKind::Qualifier
                | TokenKind::If
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::Switch
                | TokenKind::Return
                | TokenKind::BraceClose
        ) && list.level(next) == list.get(next).brace_level;
        if ends && starts {
            add_vsemi_after(list, prev);
        }
    }
}
