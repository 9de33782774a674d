//! Stage 4: the semantic re-labeler.
//!
//! One global pass visits every chunk with its nearest non-newline
//! neighbours and re-classifies it by a deterministic decision table;
//! a second pass marks variable definitions once function parameters
//! are known. Heuristics bail early when anything looks off; ambiguity
//! settles on the tamer verdict (call over definition, reference over
//! declaration).

pub mod function;
pub mod labels;
pub mod special;
pub mod vardef;

use tracing::debug;

use crate::chunk::{ChunkId, ChunkList, Nav};
use crate::lang::{LangMask, LANG_C, LANG_CPP, LANG_CS, LANG_D, LANG_OC, LANG_PAWN, LANG_VALA};
use crate::token::{ChunkFlags, TokenKind};

pub use labels::combine_labels;

use function::{
    fix_fcn_def_params, mark_class_ctor, mark_function, mark_function_type, mark_namespace,
};
use special::{
    handle_cpp_lambda, handle_cpp_template, handle_cs_property, handle_cs_square_stmt,
    handle_d_template, handle_java_assert, handle_oc_block_literal, handle_oc_block_type,
    handle_oc_class, handle_oc_message_decl, handle_oc_message_send, is_oc_block,
    mark_template_func,
};
use vardef::{
    fix_var_def, mark_define_expressions, mark_lvalue, mark_variable_definition,
    pawn_add_virtual_semicolons,
};

/// WORD -> TYPE, `*` -> PTR_TYPE, `&` -> BYREF.
pub(crate) fn make_type(list: &mut ChunkList, id: ChunkId) {
    if list.kind(id) == TokenKind::Word {
        list.set_kind(id, TokenKind::Type);
    } else if list.is_star(id) {
        list.set_kind(id, TokenKind::PtrType);
    } else if list.is_addr(id) {
        list.set_kind(id, TokenKind::Byref);
    }
}

/// Flags everything between an open paren/brace and its match, with
/// optional retag of the pair and parent attribution. Returns the
/// chunk after the close.
pub(crate) fn flag_parens(
    list: &mut ChunkList,
    po: ChunkId,
    flags: ChunkFlags,
    open_kind: Option<TokenKind>,
    parent: TokenKind,
    parent_all: bool,
) -> Option<ChunkId> {
    let Some(close) = list.skip_to_match(po, Nav::SkipPreproc) else {
        debug!("flag_parens: no match for '{}'", list.text(po));
        return None;
    };
    if close == po {
        return list.next_nnl(close, Nav::SkipPreproc);
    }

    if !flags.is_empty() || (parent_all && parent != TokenKind::None) {
        let mut cur = list.next(po, Nav::SkipPreproc);
        while let Some(id) = cur {
            if id == close {
                break;
            }
            list.add_flags(id, flags);
            if parent_all {
                list.set_parent(id, parent);
            }
            cur = list.next(id, Nav::SkipPreproc);
        }
    }

    if let Some(open) = open_kind {
        list.set_kind(po, open);
        if let Some(ck) = open.matching_close() {
            list.set_kind(close, ck);
        }
    }
    if parent != TokenKind::None {
        list.set_parent(po, parent);
        list.set_parent(close, parent);
    }
    list.next_nnl(close, Nav::SkipPreproc)
}

/// Sets the parent on an open bracket and its close. Returns the chunk
/// after the close.
pub(crate) fn set_paren_parent(
    list: &mut ChunkList,
    start: ChunkId,
    parent: TokenKind,
) -> Option<ChunkId> {
    let end = list.skip_to_match(start, Nav::SkipPreproc)?;
    list.set_parent(start, parent);
    list.set_parent(end, parent);
    list.next_nnl(end, Nav::SkipPreproc)
}

/// Scan backwards to see whether `pc` ends a type chain (so a
/// following `*` or word starts a declaration).
pub(crate) fn chunk_ends_type(list: &ChunkList, pc: Option<ChunkId>) -> bool {
    let mut cur = pc;
    let mut cnt = 0;
    let mut last_lval = false;

    while let Some(id) = cur {
        let kind = list.kind(id);
        match kind {
            TokenKind::Word
            | TokenKind::Type
            | TokenKind::PtrType
            | TokenKind::Struct
            | TokenKind::DcMember
            | TokenKind::Qualifier => {
                cnt += 1;
                last_lval = list.flags(id).contains(ChunkFlags::LVALUE);
                cur = list.prev_nnl(id, Nav::All);
                continue;
            }
            _ => {}
        }
        if list.is_semicolon(id)
            || kind == TokenKind::Typedef
            || kind == TokenKind::BraceOpen
            || kind == TokenKind::BraceClose
            || (kind == TokenKind::SParenOpen && last_lval)
        {
            return cnt > 0;
        }
        return false;
    }
    // Hit the start of the file.
    true
}

/// From a word or `::`, skip to the last word of a `a::b::c` chain.
pub(crate) fn skip_dc_member(list: &ChunkList, start: ChunkId) -> Option<ChunkId> {
    let mut pc = start;
    let mut next = if list.kind(pc) == TokenKind::DcMember {
        Some(pc)
    } else {
        list.next_nnl(pc, Nav::All)
    };
    while let Some(n) = next {
        if list.kind(n) != TokenKind::DcMember {
            break;
        }
        pc = list.next_nnl(n, Nav::All)?;
        next = list.next_nnl(pc, Nav::All);
    }
    Some(pc)
}

/// If on an `<` of a template, skip to after the matching `>`.
pub(crate) fn skip_template_next(list: &ChunkList, id: Option<ChunkId>) -> Option<ChunkId> {
    let id = id?;
    if list.kind(id) == TokenKind::AngleOpen {
        let close = list.skip_to_match(id, Nav::All)?;
        return list.next_nnl(close, Nav::All);
    }
    Some(id)
}

/// If on the `>` of a template, skip to before the matching `<`.
pub(crate) fn skip_template_prev(list: &ChunkList, id: Option<ChunkId>) -> Option<ChunkId> {
    let id = id?;
    if list.kind(id) == TokenKind::AngleClose {
        let open = list.skip_to_match_rev(id, Nav::All)?;
        return list.prev_nnl(open, Nav::All);
    }
    Some(id)
}

/// If on `__attribute__`, skip past the double-paren group.
pub(crate) fn skip_attribute_next(list: &ChunkList, id: Option<ChunkId>) -> Option<ChunkId> {
    let id = id?;
    if list.kind(id) == TokenKind::Attribute {
        let paren = list.next_nnl(id, Nav::All)?;
        if list.is_paren_open(paren) {
            let close = list.skip_to_match(paren, Nav::All)?;
            return list.next_nnl(close, Nav::All);
        }
    }
    Some(id)
}

/// If on the close paren of an attribute, skip to before it.
pub(crate) fn skip_attribute_prev(list: &ChunkList, id: Option<ChunkId>) -> Option<ChunkId> {
    let id = id?;
    if list.is_paren_close(id) && list.parent(id) == TokenKind::Attribute {
        let open = list.skip_to_match_rev(id, Nav::All)?;
        let attr = list.prev_nnl(open, Nav::All)?;
        if list.kind(attr) == TokenKind::Attribute {
            return list.prev_nnl(attr, Nav::All);
        }
    }
    Some(id)
}

fn kind_of(list: &ChunkList, id: Option<ChunkId>) -> TokenKind {
    id.map(|i| list.kind(i)).unwrap_or(TokenKind::None)
}

/// The global re-labeling pass followed by the variable-definition
/// pass.
pub fn fix_symbols(list: &mut ChunkList, lang: LangMask, filename: &str) {
    mark_define_expressions(list);

    let mut cur = list.head();
    while let Some(pc) = cur {
        if list.kind(pc) == TokenKind::Assign {
            mark_lvalue(list, pc);
        }
        cur = list.next_nnl(pc, Nav::All);
    }

    let mut cur = list.head();
    if let Some(id) = cur {
        if list.is_newline(id) {
            cur = list.next_nnl(id, Nav::All);
        }
    }
    while let Some(pc) = cur {
        if !list.is_newline(pc) {
            let prev = list.prev_nnl(pc, Nav::SkipPreproc);
            let next = list.next_nnl(pc, Nav::SkipPreproc);
            do_symbol_check(list, lang, filename, prev, pc, next);
        }
        cur = list.next_nnl(pc, Nav::All);
    }

    if lang & LANG_PAWN != 0 {
        pawn_add_virtual_semicolons(list);
    }

    // Second pass: variable definitions need function params labeled
    // first.
    let mut square_level = -1i32;
    let mut cur = list.head();
    while let Some(pc) = cur {
        // No variable definitions inside [ ].
        if square_level < 0 {
            if list.kind(pc) == TokenKind::SquareOpen {
                square_level = list.level(pc);
            }
        } else if list.level(pc) <= square_level {
            square_level = -1;
        }

        let kind = list.kind(pc);
        if square_level < 0
            && list.flags(pc).contains(ChunkFlags::STMT_START)
            && matches!(
                kind,
                TokenKind::Qualifier | TokenKind::Type | TokenKind::Word | TokenKind::Extern
            )
            && list.parent(pc) != TokenKind::Enum
            && !list.flags(pc).contains(ChunkFlags::IN_ENUM)
        {
            cur = fix_var_def(list, lang, pc);
        } else {
            cur = list.next_nnl(pc, Nav::All);
        }
    }
}

/// The per-chunk decision table. `prev`/`next` are the nearest
/// non-newline neighbours (preprocessor-local).
fn do_symbol_check(
    list: &mut ChunkList,
    lang: LangMask,
    filename: &str,
    prev: Option<ChunkId>,
    pc: ChunkId,
    next: Option<ChunkId>,
) {
    let pk = kind_of(list, prev);
    let ck = list.kind(pc);
    let nk = kind_of(list, next);

    // Objective-C boxed literals: @(...), @{...}, @[...].
    if ck == TokenKind::OcAt {
        if let Some(n) = next {
            match nk {
                TokenKind::ParenOpen | TokenKind::BraceOpen | TokenKind::SquareOpen => {
                    flag_parens(list, n, ChunkFlags::OC_BOXED, None, TokenKind::OcAt, false);
                }
                _ => list.set_parent(n, TokenKind::OcAt),
            }
        }
    }

    // D: const(...) is a cast-like construct.
    if lang & LANG_D != 0
        && ck == TokenKind::Qualifier
        && list.is_str(pc, "const")
        && nk == TokenKind::ParenOpen
    {
        list.set_kind(pc, TokenKind::DCast);
        if let Some(n) = next {
            set_paren_parent(list, n, TokenKind::DCast);
        }
    }

    // Read live: the D-cast conversion above may just have happened.
    let ck = list.kind(pc);
    if nk == TokenKind::ParenOpen
        && matches!(ck, TokenKind::DCast | TokenKind::Delegate | TokenKind::Align)
    {
        let after = next.and_then(|n| set_paren_parent(list, n, ck));

        if ck == TokenKind::DCast {
            if let Some(a) = after {
                match list.kind(a) {
                    TokenKind::Star => list.set_kind(a, TokenKind::Deref),
                    TokenKind::Amp => list.set_kind(a, TokenKind::Addr),
                    TokenKind::Minus => list.set_kind(a, TokenKind::Neg),
                    TokenKind::Plus => list.set_kind(a, TokenKind::Pos),
                    _ => {}
                }
            }
        }

        if ck == TokenKind::Delegate {
            if let Some(a) = after {
                list.set_parent(a, TokenKind::Delegate);
                if list.level(a) == list.get(a).brace_level {
                    list.add_flags(a, ChunkFlags::VAR_DEF);
                }
            }
            let mut tmp = list.prev_nnl(pc, Nav::All);
            while let Some(t) = tmp {
                if list.is_semicolon(t)
                    || list.kind(t) == TokenKind::BraceOpen
                    || list.kind(t) == TokenKind::VBraceOpen
                {
                    break;
                }
                make_type(list, t);
                tmp = list.prev_nnl(t, Nav::All);
            }
        }

        if ck == TokenKind::Align {
            if let Some(a) = after {
                match list.kind(a) {
                    TokenKind::BraceOpen => {
                        set_paren_parent(list, a, TokenKind::Align);
                    }
                    TokenKind::Colon => list.set_parent(a, TokenKind::Align),
                    _ => {}
                }
            }
        }
    }

    if ck == TokenKind::Invariant {
        if nk == TokenKind::ParenOpen {
            if let Some(n) = next {
                list.set_parent(n, ck);
                let mut tmp = list.next(n, Nav::All);
                while let Some(t) = tmp {
                    if list.kind(t) == TokenKind::ParenClose {
                        list.set_parent(t, ck);
                        break;
                    }
                    make_type(list, t);
                    tmp = list.next(t, Nav::All);
                }
            }
        } else {
            list.set_kind(pc, TokenKind::Qualifier);
        }
    }

    if pk == TokenKind::BraceOpen
        && matches!(ck, TokenKind::Getset | TokenKind::GetsetEmpty)
    {
        if let Some(p) = prev {
            flag_parens(list, p, ChunkFlags::NONE, None, TokenKind::Getset, false);
        }
    }

    // Objective-C message decls, sends, and block literals.
    if lang & LANG_OC != 0 {
        if list.flags(pc).contains(ChunkFlags::STMT_START)
            && (list.is_str(pc, "-") || list.is_str(pc, "+"))
            && next.map(|n| list.is_str(n, "(")).unwrap_or(false)
        {
            handle_oc_message_decl(list, pc);
        }
        if list.flags(pc).contains(ChunkFlags::EXPR_START) {
            if list.kind(pc) == TokenKind::SquareOpen {
                handle_oc_message_send(list, pc);
            }
            if list.kind(pc) == TokenKind::Caret {
                handle_oc_block_literal(list, lang, pc);
            }
        }
    }

    // C#: '[assembly: ...]' statements and property braces.
    if lang & (LANG_CS | LANG_VALA) != 0 {
        if list.flags(pc).contains(ChunkFlags::EXPR_START) && list.kind(pc) == TokenKind::SquareOpen
        {
            handle_cs_square_stmt(list, pc);
        }
        if let Some(n) = next {
            if list.kind(n) == TokenKind::BraceOpen
                && list.parent(n) == TokenKind::None
                && matches!(list.kind(pc), TokenKind::SquareClose | TokenKind::Word)
            {
                handle_cs_property(list, n);
            }
        }
    }

    // C++11 lambdas.
    if lang & LANG_CPP != 0
        && matches!(list.kind(pc), TokenKind::SquareOpen | TokenKind::TSquare)
        && prev.map(|p| !list.is_word(p)).unwrap_or(false)
    {
        handle_cpp_lambda(list, lang, pc);
    }

    if list.kind(pc) == TokenKind::Assign && nk == TokenKind::SquareOpen {
        if let Some(n) = next {
            set_paren_parent(list, n, TokenKind::Assign);
        }
    }

    if list.kind(pc) == TokenKind::Assert {
        handle_java_assert(list, pc);
    }
    if list.kind(pc) == TokenKind::Annotation {
        if let Some(t) = list.next_nnl(pc, Nav::All) {
            if list.is_paren_open(t) {
                set_paren_parent(list, t, TokenKind::Annotation);
            }
        }
    }

    // A [] in C#, D, and Vala only follows a type.
    if list.kind(pc) == TokenKind::TSquare && lang & (LANG_D | LANG_CS | LANG_VALA) != 0 {
        if let Some(p) = prev {
            if list.kind(p) == TokenKind::Word {
                list.set_kind(p, TokenKind::Type);
            }
        }
        if let Some(n) = next {
            if list.kind(n) == TokenKind::Word {
                list.add_flags(n, ChunkFlags::VAR_DEF);
            }
        }
    }

    if list.kind(pc) == TokenKind::Typedef {
        fix_typedef(list, lang, pc);
    }
    if matches!(
        list.kind(pc),
        TokenKind::Enum | TokenKind::Struct | TokenKind::Union
    ) {
        fix_enum_struct_union(list, lang, pc);
    }

    if list.kind(pc) == TokenKind::Extern {
        if let Some(n) = next {
            if list.is_paren_open(n) {
                // extern (C) in D
                let tmp = flag_parens(list, n, ChunkFlags::NONE, None, TokenKind::Extern, true);
                if let Some(t) = tmp {
                    if list.kind(t) == TokenKind::BraceOpen {
                        set_paren_parent(list, t, TokenKind::Extern);
                    }
                }
            } else {
                // extern "C" { ... }
                list.set_parent(n, TokenKind::Extern);
                if let Some(t) = list.next_nnl(n, Nav::All) {
                    if list.kind(t) == TokenKind::BraceOpen {
                        set_paren_parent(list, t, TokenKind::Extern);
                    }
                }
            }
        }
    }

    if list.kind(pc) == TokenKind::Template {
        if lang & LANG_D != 0 {
            handle_d_template(list, pc);
        } else {
            handle_cpp_template(list, pc);
        }
    }

    if list.kind(pc) == TokenKind::Word
        && nk == TokenKind::AngleOpen
        && kind_of(list, next) == TokenKind::AngleOpen
        && next.map(|n| list.parent(n) == TokenKind::Template).unwrap_or(false)
    {
        mark_template_func(list, pc, next.unwrap());
    }

    if list.kind(pc) == TokenKind::SquareClose && nk == TokenKind::ParenOpen {
        if let Some(n) = next {
            flag_parens(
                list,
                n,
                ChunkFlags::NONE,
                Some(TokenKind::FParenOpen),
                TokenKind::None,
                false,
            );
        }
    }

    if list.kind(pc) == TokenKind::TypeCast {
        fix_type_cast(list, pc);
    }

    if list.parent(pc) == TokenKind::Assign
        && matches!(
            list.kind(pc),
            TokenKind::BraceOpen | TokenKind::SquareOpen
        )
    {
        flag_parens(
            list,
            pc,
            ChunkFlags::IN_ARRAY_ASSIGN,
            None,
            TokenKind::None,
            false,
        );
    }

    if list.kind(pc) == TokenKind::DTemplate {
        if let Some(n) = next {
            set_paren_parent(list, n, TokenKind::DTemplate);
        }
    }

    // A word before an open paren is a function of some kind.
    if nk == TokenKind::ParenOpen {
        let tmp = next.and_then(|n| list.next_nnl(n, Nav::All));
        if lang & LANG_OC != 0 && kind_of(list, tmp) == TokenKind::Caret {
            if let Some(t) = tmp {
                handle_oc_block_type(list, t);
            }
        } else if matches!(list.kind(pc), TokenKind::Word | TokenKind::OperatorVal) {
            list.set_kind(pc, TokenKind::Function);
        } else if list.kind(pc) == TokenKind::Type {
            // Either a C++ cast, a function, or a function type:
            // "int(5.6)", "int()", "int(foo)(void)".
            let close = next.and_then(|n| {
                list.next_of_kind(n, TokenKind::ParenClose, list.level(n), Nav::All)
            });
            let after_close = close.and_then(|c| list.next(c, Nav::All));
            if kind_of(list, after_close) == TokenKind::ParenOpen {
                list.set_kind(pc, TokenKind::Function);
            } else if list.parent(pc) == TokenKind::None
                && !list.flags(pc).contains(ChunkFlags::IN_TYPEDEF)
            {
                if kind_of(list, tmp) == TokenKind::ParenClose {
                    list.set_kind(pc, TokenKind::Function);
                } else {
                    list.set_kind(pc, TokenKind::CppCast);
                    if let Some(n) = next {
                        set_paren_parent(list, n, TokenKind::CppCast);
                    }
                }
            }
        } else if list.kind(pc) == TokenKind::Attribute {
            if let Some(n) = next {
                flag_parens(
                    list,
                    n,
                    ChunkFlags::NONE,
                    Some(TokenKind::FParenOpen),
                    TokenKind::Attribute,
                    false,
                );
            }
        }
    }

    if lang & LANG_PAWN != 0 {
        if list.kind(pc) == TokenKind::Function && list.get(pc).brace_level > 0 {
            list.set_kind(pc, TokenKind::FuncCall);
        }
        if list.kind(pc) == TokenKind::State && nk == TokenKind::ParenOpen {
            if let Some(n) = next {
                set_paren_parent(list, n, TokenKind::State);
            }
        }
    } else if list.kind(pc) == TokenKind::Function
        && (list.parent(pc) == TokenKind::OcBlockExpr || !is_oc_block(list, pc))
    {
        mark_function(list, lang, filename, pc);
    }

    // C99 designated initializer members: { .field = x }
    if list.kind(pc) == TokenKind::Member
        && matches!(pk, TokenKind::Comma | TokenKind::BraceOpen)
    {
        list.set_kind(pc, TokenKind::C99Member);
        if let Some(n) = next {
            list.set_parent(n, TokenKind::C99Member);
        }
    }

    // Mark function parens and braces.
    if matches!(
        list.kind(pc),
        TokenKind::FuncDef | TokenKind::FuncCall | TokenKind::FuncCallUser | TokenKind::FuncProto
    ) {
        let fkind = list.kind(pc);
        let mut tmp = next;
        if kind_of(list, tmp) == TokenKind::SquareOpen {
            tmp = tmp.and_then(|t| set_paren_parent(list, t, fkind));
        } else if kind_of(list, tmp) == TokenKind::TSquare
            || tmp.map(|t| list.parent(t) == TokenKind::Operator).unwrap_or(false)
        {
            tmp = tmp.and_then(|t| list.next_nnl(t, Nav::All));
        }

        if let Some(t) = tmp {
            if list.is_paren_open(t) {
                let after = flag_parens(
                    list,
                    t,
                    ChunkFlags::NONE,
                    Some(TokenKind::FParenOpen),
                    fkind,
                    false,
                );
                if let Some(a) = after {
                    if list.kind(a) == TokenKind::BraceOpen {
                        if !list.flags(a).contains(ChunkFlags::IN_CONST_ARGS) {
                            set_paren_parent(list, a, fkind);
                        }
                    } else if list.is_semicolon(a) && fkind == TokenKind::FuncProto {
                        list.set_parent(a, fkind);
                    }
                }
            }
        }
    }

    // Parameters in catch ().
    if list.kind(pc) == TokenKind::Catch && nk == TokenKind::SParenOpen {
        if let Some(n) = next {
            fix_fcn_def_params(list, lang, n);
        }
    }

    if list.kind(pc) == TokenKind::Throw && pk == TokenKind::FParenClose {
        let pparent = prev.map(|p| list.parent(p)).unwrap_or(TokenKind::None);
        list.set_parent(pc, pparent);
        if nk == TokenKind::ParenOpen {
            if let Some(n) = next {
                set_paren_parent(list, n, TokenKind::Throw);
            }
        }
    }

    // Braces in "for_each_entry(xxx) { }".
    if list.kind(pc) == TokenKind::BraceOpen
        && pk == TokenKind::FParenClose
        && matches!(
            prev.map(|p| list.parent(p)).unwrap_or(TokenKind::None),
            TokenKind::FuncCall | TokenKind::FuncCallUser
        )
        && !list.flags(pc).contains(ChunkFlags::IN_CONST_ARGS)
    {
        set_paren_parent(list, pc, TokenKind::FuncCall);
    }

    // ")(" makes a function type declaration.
    if next.is_some()
        && !list
            .flags(pc)
            .intersects(ChunkFlags::IN_TYPEDEF | ChunkFlags::IN_TEMPLATE)
        && list.parent(pc) != TokenKind::CppCast
        && list.parent(pc) != TokenKind::CCast
        && !list.flags(pc).contains(ChunkFlags::IN_PREPROC)
        && !is_oc_block(list, pc)
        && list.parent(pc) != TokenKind::OcMsgDecl
        && list.parent(pc) != TokenKind::OcMsgSpec
        && list.is_str(pc, ")")
        && next.map(|n| list.is_str(n, "(")).unwrap_or(false)
    {
        if lang & LANG_D != 0 {
            if let Some(n) = next {
                flag_parens(
                    list,
                    n,
                    ChunkFlags::NONE,
                    Some(TokenKind::FParenOpen),
                    TokenKind::FuncCall,
                    false,
                );
            }
        } else {
            mark_function_type(list, lang, pc);
        }
    }

    if matches!(list.kind(pc), TokenKind::Class | TokenKind::Struct)
        && list.level(pc) == list.get(pc).brace_level
        && (list.kind(pc) != TokenKind::Struct || lang & LANG_C == 0)
    {
        mark_class_ctor(list, lang, pc);
    }

    if list.kind(pc) == TokenKind::OcClass {
        handle_oc_class(list, pc);
    }

    if list.kind(pc) == TokenKind::Namespace {
        mark_namespace(list, pc);
    }

    // Cast detection (not in D; D uses cast(...)).
    if lang & LANG_D == 0
        && list.kind(pc) == TokenKind::ParenOpen
        && matches!(
            list.parent(pc),
            TokenKind::None | TokenKind::OcMsg | TokenKind::OcBlockExpr
        )
        && matches!(
            nk,
            TokenKind::Word
                | TokenKind::Type
                | TokenKind::Struct
                | TokenKind::Qualifier
                | TokenKind::Member
                | TokenKind::DcMember
                | TokenKind::Enum
                | TokenKind::Union
        )
        && pk != TokenKind::Sizeof
        && prev.map(|p| list.parent(p) != TokenKind::Operator).unwrap_or(true)
    {
        fix_casts(list, pc);
    }

    // Expression-start re-labels.
    if list.flags(pc).contains(ChunkFlags::EXPR_START) {
        match list.kind(pc) {
            TokenKind::Star => {
                let k = if pk == TokenKind::AngleClose {
                    TokenKind::PtrType
                } else {
                    TokenKind::Deref
                };
                list.set_kind(pc, k);
            }
            TokenKind::Minus => list.set_kind(pc, TokenKind::Neg),
            TokenKind::Plus => list.set_kind(pc, TokenKind::Pos),
            TokenKind::IncdecAfter => list.set_kind(pc, TokenKind::IncdecBefore),
            TokenKind::Amp => list.set_kind(pc, TokenKind::Addr),
            TokenKind::Caret => {
                if lang & LANG_OC != 0 {
                    handle_oc_block_literal(list, lang, pc);
                }
            }
            _ => {}
        }
    }

    // Variable definition starting with struct/enum/union/class.
    if !list.flags(pc).contains(ChunkFlags::IN_TYPEDEF)
        && prev.map(|p| list.parent(p) != TokenKind::CppCast).unwrap_or(true)
        && prev
            .map(|p| !list.flags(p).contains(ChunkFlags::IN_FCN_DEF))
            .unwrap_or(true)
        && matches!(
            list.kind(pc),
            TokenKind::Struct | TokenKind::Union | TokenKind::Class | TokenKind::Enum
        )
    {
        let mut tmp = next.and_then(|n| skip_dc_member(list, n));
        if let Some(t) = tmp {
            if matches!(list.kind(t), TokenKind::Type | TokenKind::Word) {
                list.set_parent(t, list.kind(pc));
                list.set_kind(t, TokenKind::Type);
                tmp = list.next_nnl(t, Nav::All);
            }
        }
        if let Some(t) = tmp {
            if list.kind(t) == TokenKind::BraceOpen {
                tmp = list
                    .skip_to_match(t, Nav::All)
                    .and_then(|c| list.next_nnl(c, Nav::All));
            }
        }
        if let Some(t) = tmp {
            if list.is_star(t) || list.is_addr(t) || list.kind(t) == TokenKind::Word {
                mark_variable_definition(list, t, ChunkFlags::VAR_DEF);
            }
        }
    }

    if list.kind(pc) == TokenKind::OcProperty {
        let mut tmp = list.next_nnl(pc, Nav::All);
        if let Some(t) = tmp {
            if list.is_paren_open(t) {
                tmp = list
                    .skip_to_match(t, Nav::All)
                    .and_then(|c| list.next_nnl(c, Nav::All));
            }
        }
        if let Some(t) = tmp {
            fix_var_def(list, lang, t);
        }
    }

    // The paren pair after a function-like macro.
    if list.kind(pc) == TokenKind::MacroFunc {
        if let Some(n) = next {
            flag_parens(
                list,
                n,
                ChunkFlags::IN_FCN_CALL,
                Some(TokenKind::FParenOpen),
                TokenKind::MacroFunc,
                false,
            );
        }
    }

    if list.kind(pc) == TokenKind::Delete && nk == TokenKind::TSquare {
        if let Some(n) = next {
            list.set_parent(n, TokenKind::Delete);
        }
    }

    // '*' -> PTR_TYPE / DEREF / ARITH.
    if list.kind(pc) == TokenKind::Star {
        let nk = kind_of(list, next);
        if next.map(|n| list.is_paren_close(n)).unwrap_or(false) || nk == TokenKind::Comma {
            list.set_kind(pc, TokenKind::PtrType);
        } else if lang & LANG_OC != 0 && nk == TokenKind::Star {
            // Pointer-to-pointer in message decls.
            let pparent = prev.map(|p| list.parent(p)).unwrap_or(TokenKind::None);
            list.set_kind(pc, TokenKind::PtrType);
            list.set_parent(pc, pparent);
            if let Some(n) = next {
                list.set_kind(n, TokenKind::PtrType);
                list.set_parent(n, pparent);
            }
        } else if pk == TokenKind::Sizeof || pk == TokenKind::Delete {
            list.set_kind(pc, TokenKind::Deref);
        } else if (pk == TokenKind::Word && chunk_ends_type(list, prev))
            || pk == TokenKind::DcMember
            || pk == TokenKind::PtrType
        {
            list.set_kind(pc, TokenKind::PtrType);
        } else if nk == TokenKind::SquareOpen {
            list.set_kind(pc, TokenKind::PtrType);
        } else {
            // A punctuator before makes it a deref, except a close
            // paren (cast ends) unless that paren was a macro call.
            let deref = prev
                .map(|p| {
                    list.flags(p).contains(ChunkFlags::PUNCTUATOR)
                        && (!list.is_paren_close(p) || list.parent(p) == TokenKind::MacroFunc)
                        && list.kind(p) != TokenKind::SquareClose
                        && list.kind(p) != TokenKind::DcMember
                })
                .unwrap_or(false);
            list.set_kind(
                pc,
                if deref {
                    TokenKind::Deref
                } else {
                    TokenKind::Arith
                },
            );
        }
    }

    // '&' -> ADDR / BYREF / ARITH.
    if list.kind(pc) == TokenKind::Amp {
        if pk == TokenKind::Delete {
            list.set_kind(pc, TokenKind::Addr);
        } else if pk == TokenKind::Type {
            list.set_kind(pc, TokenKind::Byref);
        } else {
            list.set_kind(pc, TokenKind::Arith);
            if pk == TokenKind::Word {
                if let Some(p) = prev {
                    let tmp = list.prev_nnl(p, Nav::All);
                    let tk = kind_of(list, tmp);
                    if tmp.map(|t| list.is_semicolon(t)).unwrap_or(false)
                        || tk == TokenKind::BraceOpen
                        || tk == TokenKind::Qualifier
                    {
                        // "const a & b;" is a declaration after all.
                        list.set_kind(p, TokenKind::Type);
                        list.set_kind(pc, TokenKind::Addr);
                    }
                }
            }
        }
    }

    if matches!(list.kind(pc), TokenKind::Minus | TokenKind::Plus) {
        let is_minus = list.kind(pc) == TokenKind::Minus;
        if matches!(pk, TokenKind::Pos | TokenKind::Neg) || pk == TokenKind::OcClass {
            list.set_kind(pc, if is_minus { TokenKind::Neg } else { TokenKind::Pos });
        } else {
            list.set_kind(pc, TokenKind::Arith);
        }
    }
}

fn is_ucase_str(s: &str) -> bool {
    s.chars().all(|c| c.to_ascii_uppercase() == c)
}

/// Checks whether the paren pair starting at `start` is a C-style
/// cast, with the tiered verdict from the original: "for sure" when
/// the last inner token is a type or `*`; "guessed" for single
/// all-caps or `_t` words; rejected on ambiguous follow-on.
fn fix_casts(list: &mut ChunkList, start: ChunkId) {
    let prev = list.prev_nnl(start, Nav::All);
    if kind_of(list, prev) == TokenKind::PpDefined {
        return;
    }

    // Only WORD, TYPE, qualifiers, '::', '*', '&' may appear inside.
    let mut pc = list.next_nnl(start, Nav::All);
    let first = pc;
    let mut last = None;
    let mut count = 0;
    let mut word_count = 0i32;
    while let Some(id) = pc {
        let k = list.kind(id);
        let ok = list.is_type_like(id)
            || k == TokenKind::Word
            || k == TokenKind::Qualifier
            || k == TokenKind::DcMember
            || k == TokenKind::Star
            || k == TokenKind::Amp;
        if !ok {
            break;
        }
        if k == TokenKind::Word {
            word_count += 1;
        } else if k == TokenKind::DcMember {
            word_count -= 1;
        }
        last = Some(id);
        pc = list.next_nnl(id, Nav::All);
        count += 1;
    }

    let Some(close) = pc else { return };
    if list.kind(close) != TokenKind::ParenClose || kind_of(list, prev) == TokenKind::OcClass {
        return;
    }
    if word_count > 1 {
        debug!("fix_casts: too many words");
        return;
    }
    let Some(last) = last else { return };

    let mut doubtful = false;
    let verdict_sure = matches!(
        list.kind(last),
        TokenKind::Star | TokenKind::PtrType | TokenKind::Type
    );
    if !verdict_sure {
        if count != 1 {
            return;
        }
        // Single word: guess on naming convention.
        let text = list.text(last);
        let bytes = text.as_bytes();
        let is_t = bytes.len() > 3 && text.ends_with("_t");
        if !is_t && !is_ucase_str(text) {
            doubtful = true;
        }

        // What comes after the close decides.
        let after_first = list.next_nnl(close, Nav::All);
        let mut after = after_first;
        while let Some(a) = after {
            if list.kind(a) != TokenKind::ParenOpen {
                break;
            }
            after = list.next_nnl(a, Nav::All);
        }
        let Some(after) = after else { return };
        let Some(pc1) = after_first else { return };

        let mut nope = false;
        let ak = list.kind(after);
        if list.is_star(pc1) || list.is_addr(pc1) {
            if matches!(
                ak,
                TokenKind::Number | TokenKind::NumberFp | TokenKind::Str
            ) || doubtful
            {
                nope = true;
            }
        } else if list.kind(pc1) == TokenKind::Minus {
            if ak == TokenKind::Str || doubtful {
                nope = true;
            }
        } else if list.kind(pc1) == TokenKind::Plus {
            if !matches!(ak, TokenKind::Number | TokenKind::NumberFp) || doubtful {
                nope = true;
            }
        } else if !matches!(
            list.kind(pc1),
            TokenKind::Number
                | TokenKind::NumberFp
                | TokenKind::Word
                | TokenKind::Type
                | TokenKind::ParenOpen
                | TokenKind::Str
                | TokenKind::Sizeof
                | TokenKind::FuncCall
                | TokenKind::FuncCallUser
                | TokenKind::Function
                | TokenKind::BraceOpen
        ) {
            debug!("fix_casts: not a cast, followed by {:?}", list.kind(pc1));
            return;
        }
        if nope {
            return;
        }
    }

    // A 'cast' followed by ';', ',' or ')' is not one.
    let after_close = list.next_nnl(close, Nav::All);
    if let Some(a) = after_close {
        if list.is_semicolon(a) || list.kind(a) == TokenKind::Comma || list.is_paren_close(a) {
            return;
        }
    }

    list.set_parent(start, TokenKind::CCast);
    list.set_parent(close, TokenKind::CCast);

    let mut cur = first;
    while let Some(id) = cur {
        if id == close {
            break;
        }
        list.set_parent(id, TokenKind::CCast);
        make_type(list, id);
        cur = list.next_nnl(id, Nav::All);
    }

    if let Some(a) = after_close {
        list.add_flags(a, ChunkFlags::EXPR_START);
        if list.is_opening_brace(a) {
            set_paren_parent(list, a, TokenKind::CCast);
        }
    }
}

/// `static_cast<...>(...)`: the angle contents are types.
fn fix_type_cast(list: &mut ChunkList, start: ChunkId) {
    let Some(first) = list.next_nnl(start, Nav::All) else {
        return;
    };
    if list.kind(first) != TokenKind::AngleOpen {
        return;
    }
    let start_level = list.level(start);
    let mut cur = list.next_nnl(first, Nav::All);
    while let Some(id) = cur {
        if list.level(id) < start_level {
            return;
        }
        if list.level(id) == start_level && list.kind(id) == TokenKind::AngleClose {
            let Some(n) = list.next_nnl(id, Nav::All) else {
                return;
            };
            if list.is_str(n, "(") {
                set_paren_parent(list, n, TokenKind::TypeCast);
            }
            return;
        }
        make_type(list, id);
        cur = list.next_nnl(id, Nav::All);
    }
}

/// We are on an enum/struct/union tag: mark the tag type, flag the
/// body, and pick up inline variable definitions after the close
/// brace.
fn fix_enum_struct_union(list: &mut ChunkList, lang: LangMask, pc: ChunkId) {
    // A cast like (struct foo *) was already handled.
    if list.parent(pc) == TokenKind::CCast {
        return;
    }
    let kind = list.kind(pc);
    let mut flags = ChunkFlags::VAR_DEF;
    let in_fcn_paren = list.flags(pc) & ChunkFlags::IN_FCN_DEF;

    let mut prev: Option<ChunkId> = None;
    let mut next = list.next_nnl(pc, Nav::All);
    if kind_of(list, next) == TokenKind::EnumClass {
        next = next.and_then(|n| list.next_nnl(n, Nav::All));
    }
    if kind_of(list, next) == TokenKind::Type {
        let n = next.unwrap();
        list.set_parent(n, kind);
        prev = Some(n);
        next = list.next_nnl(n, Nav::All);

        let Some(mut n2) = next else { return };
        if lang & LANG_PAWN != 0 && list.kind(n2) == TokenKind::ParenOpen {
            next = set_paren_parent(list, n2, TokenKind::Enum);
        } else if kind == TokenKind::Enum && list.kind(n2) == TokenKind::Colon {
            // enum TYPE : INT_TYPE {
            next = list.next_nnl(n2, Nav::All);
            if let Some(n3) = next {
                make_type(list, n3);
                n2 = n3;
                next = list.next_nnl(n2, Nav::All);
            }
        }
    }

    if kind_of(list, next) == TokenKind::BraceOpen {
        let brace = next.unwrap();
        let body_flag = if kind == TokenKind::Enum {
            ChunkFlags::IN_ENUM
        } else {
            ChunkFlags::IN_STRUCT
        };
        flag_parens(list, brace, body_flag, None, TokenKind::None, false);

        if kind == TokenKind::Union || kind == TokenKind::Struct {
            vardef::mark_struct_union_body(list, lang, brace);
        }

        list.set_parent(brace, kind);
        next = list.next_of_kind(brace, TokenKind::BraceClose, list.level(pc), Nav::All);
        flags |= ChunkFlags::VAR_INLINE;
        if let Some(c) = next {
            list.set_parent(c, kind);
            next = list.next_nnl(c, Nav::All);
        }
        if let Some(p) = prev {
            list.add_flags(p, ChunkFlags::DEF);
        }
        prev = None;
    } else if let Some(p) = prev {
        // No body: "struct foo x;" is a ref, "struct foo;" a proto.
        if next.map(|n| !list.is_semicolon(n)).unwrap_or(true) {
            list.add_flags(p, ChunkFlags::REF);
        } else {
            list.add_flags(p, ChunkFlags::PROTO);
        }
    }

    if next.map(|n| list.is_paren_close(n)).unwrap_or(true) {
        return;
    }

    if next.map(|n| !list.is_semicolon(n)).unwrap_or(false) {
        if lang & LANG_PAWN != 0 {
            return;
        }
        // D enums do not need a trailing semicolon; insert a virtual
        // one to keep the statement walk honest.
        if lang & LANG_D != 0 {
            if let Some(n) = next {
                let at = list.prev_nnl(n, Nav::All);
                if let Some(at) = at {
                    next = Some(vardef::add_vsemi_after(list, at));
                }
            }
        }
    }

    // Now pointing at ';' or the first variable.
    let level = list.level(pc);
    while let Some(n) = next {
        if list.is_semicolon(n) || list.kind(n) == TokenKind::Assign {
            break;
        }
        if (in_fcn_paren.0 ^ (list.flags(n) & ChunkFlags::IN_FCN_DEF).0) != 0 {
            break;
        }
        if list.level(n) == level {
            if list.kind(n) == TokenKind::Word {
                list.add_flags(n, flags);
            }
            if list.kind(n) == TokenKind::Star {
                list.set_kind(n, TokenKind::PtrType);
            }
            // Done at a comma inside a function param list.
            if matches!(list.kind(n), TokenKind::Comma | TokenKind::FParenClose)
                && list
                    .flags(n)
                    .intersects(ChunkFlags::IN_FCN_DEF | ChunkFlags::IN_FCN_CALL)
            {
                return;
            }
        }
        next = list.next_nnl(n, Nav::All);
    }

    if let Some(n) = next {
        if prev.is_none()
            && list.kind(n) == TokenKind::Semicolon
            && list.parent(n) == TokenKind::None
        {
            list.set_parent(n, kind);
        }
    }
}

/// Typedef walk: everything to the level-matched `;` is IN_TYPEDEF;
/// `)(` inside makes it a function type; otherwise the last TYPE
/// before the `;` is the alias, carrying the struct/union/enum bit
/// when the source declared a tag.
fn fix_typedef(list: &mut ChunkList, lang: LangMask, start: ChunkId) {
    let start_level = list.level(start);
    let mut the_type: Option<ChunkId> = None;
    let mut last_op: Option<ChunkId> = None;

    let mut next = list.next_nnl(start, Nav::SkipPreproc);
    while let Some(n) = next {
        if list.level(n) < start_level {
            break;
        }
        list.add_flags(n, ChunkFlags::IN_TYPEDEF);
        if start_level == list.level(n) {
            if list.is_semicolon(n) {
                list.set_parent(n, TokenKind::Typedef);
                break;
            }
            if list.kind(n) == TokenKind::Attribute {
                break;
            }
            if lang & LANG_D != 0 && list.kind(n) == TokenKind::Assign {
                list.set_parent(n, TokenKind::Typedef);
                break;
            }
            make_type(list, n);
            if list.kind(n) == TokenKind::Type {
                the_type = Some(n);
            }
            list.del_flags(n, ChunkFlags::VAR_DEF);
            if list.is_str(n, "(") {
                last_op = Some(n);
            }
        }
        next = list.next_nnl(n, Nav::SkipPreproc);
    }

    if let Some(op) = last_op {
        // Function typedef: "typedef RET (*name)(args);" or
        // "typedef RET name(args);"
        flag_parens(
            list,
            op,
            ChunkFlags::NONE,
            Some(TokenKind::FParenOpen),
            TokenKind::Typedef,
            false,
        );
        fix_fcn_def_params(list, lang, op);

        let mut the_type = match list.prev_nnl(op, Nav::SkipPreproc) {
            Some(t) => t,
            None => return,
        };
        if list.is_paren_close(the_type) {
            mark_function_type(list, lang, the_type);
            the_type = match list.prev_nnl(the_type, Nav::SkipPreproc) {
                Some(t) => t,
                None => return,
            };
        } else {
            list.set_kind(the_type, TokenKind::FuncType);
        }
        list.set_parent(the_type, TokenKind::Typedef);
        debug!("fix_typedef: function typedef '{}'", list.text(the_type));
        return;
    }

    let Some(after) = list.next_nnl(start, Nav::SkipPreproc) else {
        return;
    };
    let tag = list.kind(after);
    if !matches!(
        tag,
        TokenKind::Enum | TokenKind::Struct | TokenKind::Union
    ) {
        if let Some(t) = the_type {
            debug!("fix_typedef: regular typedef '{}'", list.text(t));
            list.set_parent(t, TokenKind::Typedef);
        }
        return;
    }

    // Skip the tag body so it is not mistaken for a return type.
    let mut next = list.next_nnl(after, Nav::SkipPreproc);
    if kind_of(list, next) == TokenKind::Type {
        next = next.and_then(|n| list.next_nnl(n, Nav::SkipPreproc));
    }
    if kind_of(list, next) == TokenKind::BraceOpen {
        let brace = next.unwrap();
        list.set_parent(brace, tag);
        if let Some(close) =
            list.next_of_kind(brace, TokenKind::BraceClose, list.level(brace), Nav::SkipPreproc)
        {
            list.set_parent(close, tag);
        }
    }

    if let Some(t) = the_type {
        debug!("fix_typedef: {:?} typedef '{}'", tag, list.text(t));
        list.set_parent(t, TokenKind::Typedef);
        let bit = match tag {
            TokenKind::Struct => ChunkFlags::TYPEDEF_STRUCT,
            TokenKind::Union => ChunkFlags::TYPEDEF_UNION,
            _ => ChunkFlags::TYPEDEF_ENUM,
        };
        list.add_flags(t, bit);
    }
}
