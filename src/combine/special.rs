//! Language-specific constructs: C++ templates and lambdas, D
//! templates, Objective-C classes/messages/blocks, C# properties and
//! square statements, Java asserts.

use tracing::debug;

use crate::chunk::{Chunk, ChunkId, ChunkList, Nav};
use crate::lang::LangMask;
use crate::token::{ChunkFlags, TokenKind};

use super::function::{fix_fcn_def_params, mark_function_return_type};
use super::{flag_parens, make_type, set_paren_parent};

fn kind_of(list: &ChunkList, id: Option<ChunkId>) -> TokenKind {
    id.map(|i| list.kind(i)).unwrap_or(TokenKind::None)
}

/// `template <class T> ...`: the class/struct words inside the angles
/// are types; the class after the closing angle is a template class.
pub(crate) fn handle_cpp_template(list: &mut ChunkList, pc: ChunkId) {
    let Some(angle) = list.next_nnl(pc, Nav::All) else {
        return;
    };
    if list.kind(angle) != TokenKind::AngleOpen {
        return;
    }
    list.set_parent(angle, TokenKind::Template);
    let level = list.level(angle);

    let mut close = None;
    let mut tmp = list.next(angle, Nav::All);
    while let Some(t) = tmp {
        match list.kind(t) {
            TokenKind::Class | TokenKind::Struct => list.set_kind(t, TokenKind::Type),
            TokenKind::AngleClose if list.level(t) == level => {
                list.set_parent(t, TokenKind::Template);
                close = Some(t);
                break;
            }
            _ => {}
        }
        tmp = list.next(t, Nav::All);
    }
    if let Some(c) = close {
        if let Some(after) = list.next_nnl(c, Nav::All) {
            if matches!(list.kind(after), TokenKind::Class | TokenKind::Struct) {
                list.set_parent(after, TokenKind::Template);
                if let Some(semi) =
                    list.next_of_kind(after, TokenKind::Semicolon, list.level(after), Nav::All)
                {
                    list.set_parent(semi, TokenKind::Template);
                }
            }
        }
    }
}

/// `name<args>` already known to be a template: a following paren
/// makes it a call, a following word makes the name a type.
pub(crate) fn mark_template_func(list: &mut ChunkList, pc: ChunkId, angle_open: ChunkId) {
    let Some(angle_close) = list.skip_to_match(angle_open, Nav::All) else {
        return;
    };
    let after = list.next_nnl(angle_close, Nav::All);
    match kind_of(list, after) {
        TokenKind::ParenOpen | TokenKind::FParenOpen => {
            list.set_kind(pc, TokenKind::FuncCall);
            if let Some(a) = after {
                flag_parens(
                    list,
                    a,
                    ChunkFlags::IN_FCN_CALL,
                    Some(TokenKind::FParenOpen),
                    TokenKind::FuncCall,
                    false,
                );
            }
        }
        TokenKind::Word => {
            // "Foo<int> bar;" : a templated variable definition.
            list.set_kind(pc, TokenKind::Type);
            if let Some(a) = after {
                list.add_flags(a, ChunkFlags::VAR_DEF);
            }
        }
        _ => {
            list.set_kind(pc, TokenKind::Type);
        }
    }
}

/// D template declarations: `template Name(T) { ... }`.
pub(crate) fn handle_d_template(list: &mut ChunkList, pc: ChunkId) {
    let Some(name) = list.next_nnl(pc, Nav::All) else {
        return;
    };
    if !matches!(list.kind(name), TokenKind::Word | TokenKind::Type) {
        return;
    }
    let Some(po) = list.next_nnl(name, Nav::All) else {
        return;
    };
    if list.kind(po) != TokenKind::ParenOpen {
        return;
    }
    list.set_kind(name, TokenKind::Type);
    list.set_parent(name, TokenKind::Template);
    let Some(pclose) = list.skip_to_match(po, Nav::All) else {
        return;
    };
    list.set_parent(po, TokenKind::Template);
    list.set_parent(pclose, TokenKind::Template);
    let mut t = list.next_nnl(po, Nav::All);
    while let Some(id) = t {
        if id == pclose {
            break;
        }
        if list.kind(id) == TokenKind::Word {
            make_type(list, id);
        }
        t = list.next_nnl(id, Nav::All);
    }
    if let Some(brace) = list.next_nnl(pclose, Nav::All) {
        if list.kind(brace) == TokenKind::BraceOpen {
            set_paren_parent(list, brace, TokenKind::Template);
        }
    }
}

/// `[captures](args) -> ret {body}` or `[captures](args) {body}`. The
/// `[]` token is split back into two chunks so it pairs like any other
/// bracket.
pub(crate) fn handle_cpp_lambda(list: &mut ChunkList, lang: LangMask, sq_o: ChunkId) {
    let sq_c = if list.kind(sq_o) == TokenKind::SquareOpen {
        match list.skip_to_match(sq_o, Nav::All) {
            Some(c) => c,
            None => return,
        }
    } else {
        sq_o // '[]'
    };

    let Some(pa_o) = list.next_nnl(sq_c, Nav::All) else {
        return;
    };
    if list.kind(pa_o) != TokenKind::ParenOpen {
        return;
    }
    let Some(pa_c) = list.skip_to_match(pa_o, Nav::All) else {
        return;
    };

    let mut br_o = list.next_nnl(pa_c, Nav::All);
    if br_o.map(|b| list.is_str(b, "mutable")).unwrap_or(false) {
        br_o = br_o.and_then(|b| list.next_nnl(b, Nav::All));
    }

    let mut ret: Option<ChunkId> = None;
    if br_o.map(|b| list.is_str(b, "->")).unwrap_or(false) {
        ret = br_o;
        br_o = br_o.and_then(|b| {
            list.next_of_kind(b, TokenKind::BraceOpen, list.level(b), Nav::All)
        });
    }
    let Some(br_o) = br_o else { return };
    if list.kind(br_o) != TokenKind::BraceOpen {
        return;
    }
    let Some(br_c) = list.skip_to_match(br_o, Nav::All) else {
        return;
    };

    // Looks like a lambda for sure now.
    let sq_c = if list.kind(sq_o) == TokenKind::TSquare {
        let (line, col) = {
            let c = list.get(sq_o);
            (c.line, c.col)
        };
        {
            let c = list.get_mut(sq_o);
            c.kind = TokenKind::SquareOpen;
            c.text = "[".to_string();
            c.col_end = col + 1;
        }
        let mut close = Chunk::new(TokenKind::SquareClose, "]", line, col + 1);
        close.col_end = col + 2;
        close.flags = list.flags(sq_o);
        close.level = list.level(sq_o);
        close.brace_level = list.get(sq_o).brace_level;
        close.pp_level = list.get(sq_o).pp_level;
        list.insert_after(sq_o, close)
    } else {
        sq_c
    };

    list.set_parent(sq_o, TokenKind::CppLambda);
    list.set_parent(sq_c, TokenKind::CppLambda);
    list.set_kind(pa_o, TokenKind::FParenOpen);
    list.set_parent(pa_o, TokenKind::CppLambda);
    list.set_kind(pa_c, TokenKind::FParenClose);
    list.set_parent(pa_c, TokenKind::CppLambda);
    list.set_parent(br_o, TokenKind::CppLambda);
    list.set_parent(br_c, TokenKind::CppLambda);

    if let Some(r) = ret {
        list.set_kind(r, TokenKind::CppLambdaRet);
        let mut t = list.next_nnl(r, Nav::All);
        while let Some(id) = t {
            if id == br_o {
                break;
            }
            make_type(list, id);
            t = list.next_nnl(id, Nav::All);
        }
    }

    fix_fcn_def_params(list, lang, pa_o);
}

pub(crate) fn is_oc_block(list: &ChunkList, pc: ChunkId) -> bool {
    if matches!(
        list.parent(pc),
        TokenKind::OcBlockType | TokenKind::OcBlockExpr | TokenKind::OcBlockArg
    ) || list.kind(pc) == TokenKind::OcBlockCaret
    {
        return true;
    }
    let next_caret = list
        .next(pc, Nav::All)
        .map(|n| list.kind(n) == TokenKind::OcBlockCaret)
        .unwrap_or(false);
    let prev_caret = list
        .prev(pc, Nav::All)
        .map(|p| list.kind(p) == TokenKind::OcBlockCaret)
        .unwrap_or(false);
    next_caret || prev_caret
}

/// `@interface Foo : Bar <Proto> { ivars } ... @end`
pub(crate) fn handle_oc_class(list: &mut ChunkList, pc: ChunkId) {
    debug!("handle_oc_class: '{}'", list.text(pc));

    if list.parent(pc) == TokenKind::OcProtocol {
        if let Some(tmp) = list.next_nnl(pc, Nav::All) {
            if list.is_semicolon(tmp) {
                // Forward declaration.
                list.set_parent(tmp, TokenKind::OcProtocol);
                return;
            }
        }
    }

    let mut hit_scope = false;
    let mut do_pl = 1;
    let mut tmp = list.next_nnl(pc, Nav::All);
    while let Some(t) = tmp {
        let kind = list.kind(t);
        if kind == TokenKind::OcEnd {
            break;
        }
        if do_pl == 1 && list.is_str(t, "<") {
            list.set_kind(t, TokenKind::AngleOpen);
            list.set_parent(t, TokenKind::OcProtoList);
            do_pl = 2;
        } else if do_pl == 2 && list.is_str(t, ">") {
            list.set_kind(t, TokenKind::AngleClose);
            list.set_parent(t, TokenKind::OcProtoList);
            do_pl = 0;
        }
        // Resume after the ivar block instead of walking into it.
        let mut cursor = t;
        if list.kind(t) == TokenKind::BraceOpen {
            do_pl = 0;
            list.set_parent(t, TokenKind::OcClass);
            match list.next_of_kind(t, TokenKind::BraceClose, list.level(t), Nav::All) {
                Some(c) => {
                    list.set_parent(c, TokenKind::OcClass);
                    cursor = c;
                }
                None => break,
            }
        } else if list.kind(t) == TokenKind::Colon {
            let k = if hit_scope {
                TokenKind::OcColon
            } else {
                TokenKind::ClassColon
            };
            list.set_kind(t, k);
            if k == TokenKind::ClassColon {
                list.set_parent(t, TokenKind::OcClass);
            }
        } else if list.is_str(t, "-") || list.is_str(t, "+") {
            do_pl = 0;
            if list
                .prev(t, Nav::All)
                .map(|p| list.is_newline(p))
                .unwrap_or(false)
            {
                list.set_kind(t, TokenKind::OcScope);
                list.add_flags(t, ChunkFlags::STMT_START);
                hit_scope = true;
            }
        }
        if do_pl == 2 {
            list.set_parent(t, TokenKind::OcProtoList);
        }
        tmp = list.next_nnl(cursor, Nav::All);
    }
}

/// `^RTYPE(ARGS){...}` block literal; RTYPE and ARGS optional.
pub(crate) fn handle_oc_block_literal(list: &mut ChunkList, lang: LangMask, pc: ChunkId) {
    let mut apo: Option<ChunkId> = None;
    let mut bbo: Option<ChunkId> = None;

    let mut tmp = list.next_nnl(pc, Nav::All);
    while let Some(t) = tmp {
        if list.level(t) < list.level(pc) || list.kind(t) == TokenKind::Semicolon {
            break;
        }
        if list.level(t) == list.level(pc) {
            if list.is_paren_open(t) {
                apo = Some(t);
            }
            if list.kind(t) == TokenKind::BraceOpen {
                bbo = Some(t);
                break;
            }
        }
        tmp = list.next_nnl(t, Nav::All);
    }

    let Some(bbo) = bbo else {
        debug!("handle_oc_block_literal: no braces found");
        return;
    };
    let Some(bbc) = list.skip_to_match(bbo, Nav::All) else {
        return;
    };

    list.set_kind(pc, TokenKind::OcBlockCaret);
    list.set_parent(pc, TokenKind::OcBlockExpr);

    // Optional args, then the return type backwards to the caret.
    let lbp = if let Some(apo) = apo {
        if let Some(apc) = list.skip_to_match(apo, Nav::All) {
            if list.is_paren_close(apc) {
                flag_parens(
                    list,
                    apo,
                    ChunkFlags::OC_ATYPE,
                    Some(TokenKind::FParenOpen),
                    TokenKind::OcBlockExpr,
                    true,
                );
                fix_fcn_def_params(list, lang, apo);
            }
        }
        list.prev_nnl(apo, Nav::All)
    } else {
        list.prev_nnl(bbo, Nav::All)
    };

    let mut lbp = lbp;
    while let Some(l) = lbp {
        if l == pc {
            break;
        }
        make_type(list, l);
        list.add_flags(l, ChunkFlags::OC_RTYPE);
        list.set_parent(l, TokenKind::OcBlockExpr);
        lbp = list.prev_nnl(l, Nav::All);
    }

    list.set_parent(bbo, TokenKind::OcBlockExpr);
    list.set_parent(bbc, TokenKind::OcBlockExpr);
}

/// Block types: `RTYPE (^name)(ARGS)`; triggered on `( ^`.
pub(crate) fn handle_oc_block_type(list: &mut ChunkList, pc: ChunkId) {
    if list.flags(pc).contains(ChunkFlags::IN_TYPEDEF) {
        // The typedef walk owns this one.
        return;
    }

    let Some(tpo) = list.prev_nnl(pc, Nav::All) else {
        return;
    };
    if !list.is_paren_open(tpo) {
        return;
    }
    let Some(tpc) = list.skip_to_match(tpo, Nav::All) else {
        return;
    };
    let Some(nam) = list.prev_nnl(tpc, Nav::All) else {
        return;
    };
    let Some(apo) = list.next_nnl(tpc, Nav::All) else {
        return;
    };
    let Some(apc) = list.skip_to_match(apo, Nav::All) else {
        return;
    };
    if !list.is_paren_close(apc) {
        return;
    }

    let aft = list.next_nnl(apc, Nav::All);
    let pt;
    if list.is_str(nam, "^") {
        list.set_kind(nam, TokenKind::PtrType);
        pt = TokenKind::FuncType;
    } else if matches!(
        kind_of(list, aft),
        TokenKind::Assign | TokenKind::Semicolon
    ) {
        list.set_kind(nam, TokenKind::FuncVar);
        list.add_flags(nam, ChunkFlags::VAR_DEF);
        pt = TokenKind::FuncVar;
    } else {
        list.set_kind(nam, TokenKind::FuncType);
        pt = TokenKind::FuncType;
    }

    list.set_kind(pc, TokenKind::PtrType);
    list.set_parent(pc, pt);
    list.set_kind(tpo, TokenKind::TParenOpen);
    list.set_parent(tpo, pt);
    list.set_kind(tpc, TokenKind::TParenClose);
    list.set_parent(tpc, pt);
    list.set_kind(apo, TokenKind::FParenOpen);
    list.set_parent(apo, TokenKind::FuncProto);
    list.set_kind(apc, TokenKind::FParenClose);
    list.set_parent(apc, TokenKind::FuncProto);
    fix_fcn_def_params(list, crate::lang::LANG_OC, apo);
    let before = list.prev_nnl(tpo, Nav::All);
    mark_function_return_type(list, nam, before, pt);
}

/// A type in parens inside a message declaration; marks the contents
/// as types.
fn handle_oc_md_type(
    list: &mut ChunkList,
    paren_open: ChunkId,
    ptype: TokenKind,
    flags: ChunkFlags,
) -> (Option<ChunkId>, bool) {
    if !list.is_paren_open(paren_open) {
        return (Some(paren_open), false);
    }
    let Some(paren_close) = list.skip_to_match(paren_open, Nav::All) else {
        return (Some(paren_open), false);
    };

    list.set_parent(paren_open, ptype);
    list.add_flags(paren_open, flags);
    list.set_parent(paren_close, ptype);
    list.add_flags(paren_close, flags);

    let mut cur = list.next_nnl(paren_open, Nav::All);
    while let Some(id) = cur {
        if id == paren_close {
            break;
        }
        list.add_flags(id, flags);
        make_type(list, id);
        cur = list.next_nnl(id, Nav::All);
    }

    (list.next_nnl(paren_close, Nav::All), true)
}

/// `-(type) selector:(type)arg otherLabel:(type)arg2 { }` or `;`
pub(crate) fn handle_oc_message_decl(list: &mut ChunkList, pc: ChunkId) {
    // Spec or decl? Look for ';' or '{' at this level.
    let mut tmp = list.next(pc, Nav::All);
    let pt = loop {
        let Some(t) = tmp else { return };
        if list.level(t) < list.level(pc) {
            return;
        }
        match list.kind(t) {
            TokenKind::Semicolon => break TokenKind::OcMsgSpec,
            TokenKind::BraceOpen => break TokenKind::OcMsgDecl,
            _ => tmp = list.next(t, Nav::All),
        }
    };

    list.set_kind(pc, TokenKind::OcScope);
    list.set_parent(pc, pt);

    // Return type.
    let Some(rt) = list.next_nnl(pc, Nav::All) else {
        return;
    };
    let (after_rt, did_it) = handle_oc_md_type(list, rt, pt, ChunkFlags::OC_RTYPE);
    if !did_it {
        debug!("handle_oc_message_decl: missing type parens");
        return;
    }

    // Method name / first label.
    let Some(label) = after_rt else { return };
    if list.kind(label) != TokenKind::Word {
        debug!("handle_oc_message_decl: missing method name");
        return;
    }
    list.set_kind(label, pt);
    list.set_parent(label, pt);

    let Some(mut pc2) = list.next_nnl(label, Nav::All) else {
        return;
    };

    if matches!(list.kind(pc2), TokenKind::Colon | TokenKind::OcColon) {
        pc2 = label;
        loop {
            // Optional label.
            if list.kind(pc2) == TokenKind::Word || list.kind(pc2) == pt {
                list.set_parent(pc2, pt);
                match list.next_nnl(pc2, Nav::All) {
                    Some(n) => pc2 = n,
                    None => break,
                }
            }
            // A colon must follow.
            if !list.is_str(pc2, ":") {
                break;
            }
            list.set_kind(pc2, TokenKind::OcColon);
            list.set_parent(pc2, pt);
            match list.next_nnl(pc2, Nav::All) {
                Some(n) => pc2 = n,
                None => break,
            }
            // The arg type in parens, then the arg name.
            let (after, ok) = handle_oc_md_type(list, pc2, pt, ChunkFlags::OC_ATYPE);
            if !ok {
                debug!("handle_oc_message_decl: expected arg type");
                break;
            }
            match after {
                Some(a) => {
                    list.add_flags(a, ChunkFlags::VAR_DEF);
                    match list.next_nnl(a, Nav::All) {
                        Some(n) => pc2 = n,
                        None => break,
                    }
                }
                None => break,
            }
        }
    }

    if list.kind(pc2) == TokenKind::BraceOpen {
        list.set_parent(pc2, pt);
        if let Some(close) = list.skip_to_match(pc2, Nav::All) {
            list.set_parent(close, pt);
        }
    } else if list.is_semicolon(pc2) {
        list.set_parent(pc2, pt);
    }
}

/// `[receiver selector:arg ...]` message send.
pub(crate) fn handle_oc_message_send(list: &mut ChunkList, pc: ChunkId) {
    let Some(close) = list.skip_to_match(pc, Nav::All) else {
        return;
    };
    list.set_parent(pc, TokenKind::OcMsg);
    list.set_parent(close, TokenKind::OcMsg);

    let level = list.level(pc) + 1;
    let mut cur = list.next_nnl(pc, Nav::All);
    while let Some(id) = cur {
        if id == close {
            break;
        }
        list.add_flags(id, ChunkFlags::IN_OC_MSG);
        if list.level(id) == level && list.kind(id) == TokenKind::Colon {
            list.set_kind(id, TokenKind::OcColon);
            list.set_parent(id, TokenKind::OcMsg);
        }
        cur = list.next_nnl(id, Nav::All);
    }
}

/// C# `[assembly: InternalsVisibleTo("...")]` statements.
pub(crate) fn handle_cs_square_stmt(list: &mut ChunkList, pc: ChunkId) {
    let Some(close) = list.skip_to_match(pc, Nav::All) else {
        return;
    };
    list.set_parent(pc, TokenKind::CsSqStmt);
    list.set_parent(close, TokenKind::CsSqStmt);

    let mut cur = list.next_nnl(pc, Nav::All);
    while let Some(id) = cur {
        if id == close {
            break;
        }
        if list.kind(id) == TokenKind::Colon {
            list.set_kind(id, TokenKind::TagColon);
        }
        cur = list.next_nnl(id, Nav::All);
    }
}

/// A C# property body: `Type Name { get; set; }`.
pub(crate) fn handle_cs_property(list: &mut ChunkList, brace: ChunkId) {
    set_paren_parent(list, brace, TokenKind::CsProperty);

    // Mark the preceding name/type pair.
    let mut did_prop = false;
    let mut cur = list.prev_nnl(brace, Nav::All);
    while let Some(id) = cur {
        match list.kind(id) {
            TokenKind::Word if !did_prop => {
                list.add_flags(id, ChunkFlags::VAR_DEF);
                did_prop = true;
            }
            TokenKind::Word | TokenKind::Type => {
                make_type(list, id);
            }
            TokenKind::SquareClose | TokenKind::TSquare => {}
            _ => break,
        }
        cur = list.prev_nnl(id, Nav::All);
    }
}

/// `assert cond : message;` (Java).
pub(crate) fn handle_java_assert(list: &mut ChunkList, pc: ChunkId) {
    let level = list.level(pc);
    let mut cur = list.next_nnl(pc, Nav::All);
    while let Some(id) = cur {
        if list.level(id) < level || list.is_semicolon(id) {
            break;
        }
        if list.level(id) == level && list.kind(id) == TokenKind::Colon {
            list.set_parent(id, TokenKind::Assert);
        }
        cur = list.next_nnl(id, Nav::All);
    }
}
