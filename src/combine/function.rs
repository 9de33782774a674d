//! Function discrimination: call vs prototype vs definition vs
//! constructor-style variable, function types and pointers, class
//! constructors/destructors, and namespaces.

use tracing::{debug, warn};

use crate::chunk::{ChunkId, ChunkList, Nav};
use crate::lang::{LangMask, LANG_CPP, LANG_D, LANG_OC};
use crate::token::{ChunkFlags, TokenKind};

use super::{
    chunk_ends_type, flag_parens, make_type, set_paren_parent, skip_attribute_next,
    skip_attribute_prev, skip_template_next, skip_template_prev,
};

fn kind_of(list: &ChunkList, id: Option<ChunkId>) -> TokenKind {
    id.map(|i| list.kind(i)).unwrap_or(TokenKind::None)
}

/// Pops the parameter-name candidate off the stack and marks the rest
/// of the accumulated words as the parameter's type.
fn mark_variable_stack(list: &mut ChunkList, cs: &mut Vec<ChunkId>) {
    let Some(var_name) = cs.pop() else { return };

    // A qualified name cannot be a simple parameter name.
    let qualified = list
        .prev_nnl(var_name, Nav::All)
        .map(|p| list.kind(p) == TokenKind::DcMember)
        .unwrap_or(false);
    if qualified {
        cs.push(var_name);
    }

    let mut word_cnt = 0;
    while let Some(word_type) = cs.pop() {
        if matches!(list.kind(word_type), TokenKind::Word | TokenKind::Type) {
            list.set_kind(word_type, TokenKind::Type);
            list.add_flags(word_type, ChunkFlags::VAR_TYPE);
        }
        word_cnt += 1;
    }

    if !qualified && list.kind(var_name) == TokenKind::Word {
        if word_cnt > 0 {
            list.add_flags(var_name, ChunkFlags::VAR_DEF);
        } else {
            list.set_kind(var_name, TokenKind::Type);
            list.add_flags(var_name, ChunkFlags::VAR_TYPE);
        }
    }
}

/// Marks the parameters of a function definition/prototype: stars to
/// pointer types, words to types, the trailing word of each group to a
/// variable definition.
pub(crate) fn fix_fcn_def_params(list: &mut ChunkList, lang: LangMask, start: ChunkId) {
    debug!("fix_fcn_def_params: '{}'", list.text(start));

    let mut open = Some(start);
    while let Some(id) = open {
        if list.is_paren_open(id) {
            break;
        }
        open = list.next_nnl(id, Nav::All);
    }
    let Some(open) = open else { return };

    let level = list.level(open) + 1;
    let mut cs: Vec<ChunkId> = Vec::new();

    let mut cur = list.next_nnl(open, Nav::All);
    while let Some(pc) = cur {
        if list.level(pc) < level {
            break;
        }
        if list.level(pc) > level {
            cur = list.next_nnl(pc, Nav::All);
            continue;
        }
        if list.is_star(pc) {
            list.set_kind(pc, TokenKind::PtrType);
            cs.push(pc);
        } else if list.kind(pc) == TokenKind::Amp
            || (lang & LANG_CPP != 0 && list.is_str(pc, "&&"))
        {
            list.set_kind(pc, TokenKind::Byref);
            cs.push(pc);
        } else if matches!(list.kind(pc), TokenKind::TypeWrap | TokenKind::Word | TokenKind::Type)
        {
            cs.push(pc);
        } else if matches!(list.kind(pc), TokenKind::Comma | TokenKind::Assign) {
            mark_variable_stack(list, &mut cs);
            if list.kind(pc) == TokenKind::Assign {
                // Default value assignment in a prototype.
                list.set_parent(pc, TokenKind::FuncProto);
            }
        }
        cur = list.next_nnl(pc, Nav::All);
    }
    mark_variable_stack(list, &mut cs);
}

/// Could the chunks in `[start, end)` form a single declaration-style
/// parameter? Numbers, strings and calls say no; type-ish chains say
/// yes.
pub(crate) fn can_be_full_param(
    list: &ChunkList,
    lang: LangMask,
    start: ChunkId,
    end: ChunkId,
) -> bool {
    let mut word_cnt = 0i32;
    let mut type_count = 0i32;

    let mut cur = Some(start);
    let mut last_seen = None;
    while let Some(pc) = cur {
        if pc == end {
            break;
        }
        let kind = list.kind(pc);
        match kind {
            TokenKind::Qualifier
            | TokenKind::Struct
            | TokenKind::Enum
            | TokenKind::Union
            | TokenKind::Typename => {
                return true;
            }
            TokenKind::Word | TokenKind::Type => {
                word_cnt += 1;
                if kind == TokenKind::Type {
                    type_count += 1;
                }
            }
            TokenKind::Member | TokenKind::DcMember => {
                if word_cnt > 0 {
                    word_cnt -= 1;
                }
            }
            TokenKind::Assign => break, // default value
            TokenKind::AngleOpen => return true,
            TokenKind::Ellipsis => return true,
            TokenKind::ParenOpen if word_cnt == 0 => {
                // Old-school '(type)' param.
                let Some(close) = list.skip_to_match(pc, Nav::SkipPreproc) else {
                    return false;
                };
                let after = list.next_nnl(close, Nav::SkipPreproc);
                let ok = after
                    .map(|a| list.kind(a) == TokenKind::Comma || list.is_paren_close(a))
                    .unwrap_or(false);
                if !ok {
                    return false;
                }
                last_seen = Some(close);
                cur = list.next_nnl(close, Nav::SkipPreproc);
                word_cnt = 1;
                type_count = 1;
                continue;
            }
            TokenKind::ParenOpen if word_cnt == 1 || word_cnt == type_count => {
                // 'void (*name)' or 'void (*name)(params)'.
                let tmp1 = list.next_nnl(pc, Nav::SkipPreproc);
                let tmp2 = tmp1.and_then(|t| list.next_nnl(t, Nav::SkipPreproc));
                let tmp3 = tmp2.and_then(|t| list.next_nnl(t, Nav::SkipPreproc));
                let ok = tmp3.map(|t| list.is_str(t, ")")).unwrap_or(false)
                    && tmp1.map(|t| list.is_str(t, "*")).unwrap_or(false)
                    && kind_of(list, tmp2) == TokenKind::Word;
                if !ok {
                    return false;
                }
                let mut after = tmp3.and_then(|t| list.next_nnl(t, Nav::SkipPreproc));
                if after.map(|a| list.is_str(a, "(")).unwrap_or(false) {
                    after = after.and_then(|a| list.skip_to_match(a, Nav::SkipPreproc));
                }
                last_seen = after;
                cur = after.and_then(|a| list.next_nnl(a, Nav::SkipPreproc));
                word_cnt = 1;
                type_count = 1;
                continue;
            }
            TokenKind::TSquare => {}
            TokenKind::SquareOpen if word_cnt == 1 => {
                let Some(close) = list.skip_to_match(pc, Nav::SkipPreproc) else {
                    return false;
                };
                last_seen = Some(close);
                cur = list.next_nnl(close, Nav::SkipPreproc);
                continue;
            }
            _ if list.is_star(pc) || list.is_addr(pc) => {
                if pc == start {
                    return false;
                }
            }
            TokenKind::BoolOp if lang & LANG_CPP != 0 && list.is_str(pc, "&&") => {
                // Possible move reference.
                if word_cnt != 1 {
                    return false;
                }
            }
            _ => {
                debug!(
                    "can_be_full_param: no way, {:?} tc={} wc={}",
                    kind, type_count, word_cnt
                );
                return false;
            }
        }
        last_seen = Some(pc);
        cur = list.next_nnl(pc, Nav::SkipPreproc);
    }

    if let Some(last) = last_seen {
        if list.is_star(last) || list.is_addr(last) {
            return true;
        }
    }

    word_cnt >= 2 || (word_cnt == 1 && type_count == 1)
}

/// Process a function type that is not in a typedef; `pc` points to
/// the first close paren of `RET (*name)(args)`.
pub(crate) fn mark_function_type(list: &mut ChunkList, lang: LangMask, pc: ChunkId) -> bool {
    let mut star_count = 0;
    let mut word_count = 0;
    let mut ptrcnk: Option<ChunkId> = None;
    let mut anon = false;

    // The name: a word, or a bare '^' for anonymous ObjC block types.
    let varcnk = list.prev_nnl(pc, Nav::All);
    let is_name = varcnk.map(|v| list.is_word(v)).unwrap_or(false);
    if !is_name {
        let caret_anon = lang & LANG_OC != 0
            && varcnk.map(|v| list.is_str(v, "^")).unwrap_or(false)
            && varcnk
                .and_then(|v| list.prev_nnl(v, Nav::All))
                .map(|p| list.is_paren_open(p))
                .unwrap_or(false);
        if caret_anon {
            anon = true;
        } else {
            return nogo_exit(list, pc);
        }
    }
    let varcnk = varcnk.unwrap();

    let Some(apo) = list.next_nnl(pc, Nav::All) else {
        return nogo_exit(list, pc);
    };
    if !list.is_paren_open(apo) {
        return nogo_exit(list, pc);
    }
    let Some(apc) = list.skip_to_match(apo, Nav::All) else {
        return nogo_exit(list, pc);
    };
    let aft = list.next_nnl(apc, Nav::All);
    let pt = match kind_of(list, aft) {
        TokenKind::BraceOpen => TokenKind::FuncDef,
        TokenKind::Semicolon | TokenKind::Assign => TokenKind::FuncProto,
        _ => {
            debug!("mark_function_type: not followed by '{{' or ';'");
            return nogo_exit(list, pc);
        }
    };
    let in_typedef = list.flags(pc).contains(ChunkFlags::IN_TYPEDEF);
    let ptp = if in_typedef {
        TokenKind::FuncType
    } else {
        TokenKind::FuncVar
    };

    // Walk back across the name: at most one '*'/'^' and one word.
    let mut tmp = Some(pc);
    let mut open_paren: Option<ChunkId> = None;
    loop {
        tmp = tmp.and_then(|t| list.prev_nnl(t, Nav::All));
        let Some(t) = tmp else { break };
        if list.is_star(t)
            || list.kind(t) == TokenKind::PtrType
            || list.kind(t) == TokenKind::Caret
        {
            star_count += 1;
            ptrcnk = Some(t);
        } else if list.is_word(t)
            || matches!(list.kind(t), TokenKind::Word | TokenKind::Type)
        {
            word_count += 1;
        } else if list.kind(t) == TokenKind::DcMember {
            word_count = 0;
        } else if list.is_str(t, "(") {
            open_paren = Some(t);
            break;
        } else {
            debug!("mark_function_type: unexpected token '{}'", list.text(t));
            return nogo_exit(list, pc);
        }
    }

    if star_count > 1 || word_count > 1 || (star_count + word_count) == 0 {
        debug!(
            "mark_function_type: bad counts word:{} star:{}",
            word_count, star_count
        );
        return nogo_exit(list, pc);
    }

    // What precedes the open paren must be able to end a return type.
    let before = open_paren.and_then(|o| list.prev_nnl(o, Nav::All));
    if !chunk_ends_type(list, before) {
        return nogo_exit(list, pc);
    }

    if let Some(p) = ptrcnk {
        list.set_kind(p, TokenKind::PtrType);
    }
    if !anon {
        if in_typedef {
            list.set_kind(varcnk, TokenKind::FuncType);
        } else {
            list.set_kind(varcnk, TokenKind::FuncVar);
            list.add_flags(varcnk, ChunkFlags::VAR_DEF);
        }
    }
    list.set_kind(pc, TokenKind::TParenClose);
    list.set_parent(pc, ptp);

    list.set_kind(apo, TokenKind::FParenOpen);
    list.set_parent(apo, pt);
    list.set_kind(apc, TokenKind::FParenClose);
    list.set_parent(apc, pt);
    fix_fcn_def_params(list, lang, apo);

    if let Some(a) = aft {
        if list.is_semicolon(a) {
            list.set_parent(
                a,
                if list.flags(a).contains(ChunkFlags::IN_TYPEDEF) {
                    TokenKind::Typedef
                } else {
                    TokenKind::FuncVar
                },
            );
        } else if list.kind(a) == TokenKind::BraceOpen {
            flag_parens(list, a, ChunkFlags::NONE, None, pt, false);
        }
    }

    if let Some(opn) = open_paren {
        if !in_typedef {
            list.add_flags(opn, ChunkFlags::VAR_DEF);
        }
        list.set_kind(opn, TokenKind::TParenOpen);
        list.set_parent(opn, ptp);

        let ret_end = list.prev_nnl(opn, Nav::All);
        if let Some(r) = ret_end {
            if matches!(
                list.kind(r),
                TokenKind::Function
                    | TokenKind::FuncCall
                    | TokenKind::FuncCallUser
                    | TokenKind::FuncDef
                    | TokenKind::FuncProto
            ) {
                list.set_kind(r, TokenKind::Type);
                list.del_flags(r, ChunkFlags::VAR_DEF);
            }
        }
        mark_function_return_type(list, varcnk, ret_end, ptp);
    }
    true
}

fn nogo_exit(list: &mut ChunkList, pc: ChunkId) -> bool {
    let tmp = list.next_nnl(pc, Nav::All);
    if let Some(t) = tmp {
        if list.is_paren_open(t) {
            flag_parens(
                list,
                t,
                ChunkFlags::NONE,
                Some(TokenKind::FParenOpen),
                TokenKind::FuncCall,
                false,
            );
        }
    }
    false
}

/// Marks the return type chain before a function name and notes
/// extern/static storage on the name.
pub(crate) fn mark_function_return_type(
    list: &mut ChunkList,
    the_type: ChunkId,
    start: Option<ChunkId>,
    parent: TokenKind,
) {
    let mut cur = start;
    while let Some(pc) = cur {
        let kind = list.kind(pc);
        let type_ok = list.is_type_like(pc)
            || matches!(
                kind,
                TokenKind::Operator | TokenKind::Word | TokenKind::Addr | TokenKind::Extern
            );
        if !type_ok || list.flags(pc).contains(ChunkFlags::IN_PREPROC) {
            break;
        }

        if kind == TokenKind::Extern {
            if list.flags(the_type).contains(ChunkFlags::VAR_DEF) {
                list.del_flags(the_type, ChunkFlags::VAR_DEF);
                list.add_flags(the_type, ChunkFlags::VAR_DECL);
            }
        } else if kind == TokenKind::Qualifier && list.is_str(pc, "static") {
            list.add_flags(the_type, ChunkFlags::STATIC);
        }

        if parent != TokenKind::None {
            list.set_parent(pc, parent);
        }
        make_type(list, pc);
        cur = list.prev_nnl(pc, Nav::All);
    }
}

/// The main function classifier; `pc` is a `FUNCTION` word (or an
/// already-typed FUNC_CLASS).
pub(crate) fn mark_function(list: &mut ChunkList, lang: LangMask, filename: &str, pc: ChunkId) {
    let mut prev = list.prev_nnl_np(pc);
    let mut next = list.next_nnl_np(pc);

    // operator foo() : decide by what is in front of 'operator'.
    if list.parent(pc) == TokenKind::Operator {
        if let Some(pc_op) = list.prev_of_kind(pc, TokenKind::Operator, list.level(pc), Nav::All) {
            if list.flags(pc_op).contains(ChunkFlags::EXPR_START) {
                list.set_kind(pc, TokenKind::FuncCall);
            }
        }
        if lang & LANG_CPP != 0 {
            let mut tmp = list.prev_nnl(pc, Nav::All);
            let mut stop = None;
            while let Some(t) = tmp {
                match list.kind(t) {
                    TokenKind::BraceClose | TokenKind::Semicolon => {
                        stop = Some(t);
                        break;
                    }
                    TokenKind::Assign => {
                        list.set_kind(pc, TokenKind::FuncCall);
                        stop = Some(t);
                        break;
                    }
                    TokenKind::Template => {
                        list.set_kind(pc, TokenKind::FuncDef);
                        stop = Some(t);
                        break;
                    }
                    TokenKind::BraceOpen => {
                        match list.parent(t) {
                            TokenKind::FuncDef => list.set_kind(pc, TokenKind::FuncCall),
                            TokenKind::Class | TokenKind::Struct => {
                                list.set_kind(pc, TokenKind::FuncDef)
                            }
                            _ => {}
                        }
                        stop = Some(t);
                        break;
                    }
                    _ => tmp = list.prev_nnl(t, Nav::All),
                }
            }
            if let Some(s) = stop {
                if list.kind(pc) != TokenKind::FuncCall {
                    let mut t = list.next_nnl(s, Nav::All);
                    while let Some(id) = t {
                        if id == pc {
                            break;
                        }
                        make_type(list, id);
                        t = list.next_nnl(id, Nav::All);
                    }
                }
            }
        }
    }

    if next.map(|n| list.is_star(n) || list.is_addr(n)).unwrap_or(false) {
        next = next.and_then(|n| list.next_nnl_np(n));
    }

    if list.flags(pc).contains(ChunkFlags::IN_CONST_ARGS) {
        // Inside constructor args everything callable is a ctor-var.
        list.set_kind(pc, TokenKind::FuncCtorVar);
        next = skip_template_next(list, next);
        if let Some(n) = next {
            flag_parens(
                list,
                n,
                ChunkFlags::NONE,
                Some(TokenKind::FParenOpen),
                TokenKind::FuncCtorVar,
                true,
            );
        }
        return;
    }

    next = skip_template_next(list, next);
    next = skip_attribute_next(list, next);

    let Some(paren_open) = list.next_text(pc, "(", list.level(pc)) else {
        debug!("mark_function: no parens for '{}'", list.text(pc));
        return;
    };
    let Some(paren_close) = list.next_text(paren_open, ")", list.level(pc)) else {
        return;
    };

    // "MYTYPE (*func)(void);" -- chained calls look the same from
    // here, so require '* word' inside the first parens.
    let after_close = list.next_nnl(paren_close, Nav::All);
    if after_close.map(|t| list.is_str(t, "(")).unwrap_or(false) {
        let second_open = after_close.unwrap();
        // Skip any leading class/namespace in "T (F::*A)();"
        let mut tmp1 = next.and_then(|n| list.next_nnl(n, Nav::All));
        loop {
            let tmp2 = tmp1.and_then(|t| list.next_nnl(t, Nav::All));
            let word_then_dc = tmp1.map(|t| list.is_word(t)).unwrap_or(false)
                && kind_of(list, tmp2) == TokenKind::DcMember;
            if !word_then_dc {
                break;
            }
            tmp1 = tmp2.and_then(|t| list.next_nnl(t, Nav::All));
        }

        let mut tmp2 = tmp1.and_then(|t| list.next_nnl(t, Nav::All));
        let tmp3 = if tmp2.map(|t| list.is_str(t, ")")).unwrap_or(false) {
            let t = tmp2;
            tmp2 = None;
            t
        } else {
            tmp2.and_then(|t| list.next_nnl(t, Nav::All))
        };

        let starish = tmp1
            .map(|t| {
                list.is_star(t) || (lang & LANG_OC != 0 && list.kind(t) == TokenKind::Caret)
            })
            .unwrap_or(false);
        if tmp3.map(|t| list.is_str(t, ")")).unwrap_or(false)
            && starish
            && (tmp2.is_none() || kind_of(list, tmp2) == TokenKind::Word)
        {
            if let Some(t2) = tmp2 {
                debug!(
                    "mark_function: function variable '{}', type '{}'",
                    list.text(t2),
                    list.text(pc)
                );
                list.set_kind(t2, TokenKind::FuncVar);
                flag_parens(
                    list,
                    paren_open,
                    ChunkFlags::NONE,
                    Some(TokenKind::ParenOpen),
                    TokenKind::FuncVar,
                    false,
                );
                list.add_flags(t2, ChunkFlags::VAR_DEF);
            } else {
                debug!("mark_function: function type '{}'", list.text(pc));
                flag_parens(
                    list,
                    paren_open,
                    ChunkFlags::NONE,
                    Some(TokenKind::ParenOpen),
                    TokenKind::FuncType,
                    false,
                );
            }

            list.set_kind(pc, TokenKind::Type);
            if let Some(t1) = tmp1 {
                list.set_kind(t1, TokenKind::PtrType);
            }
            list.del_flags(pc, ChunkFlags::VAR_DEF);
            flag_parens(
                list,
                second_open,
                ChunkFlags::NONE,
                Some(TokenKind::FParenOpen),
                TokenKind::FuncProto,
                false,
            );
            fix_fcn_def_params(list, lang, second_open);
            return;
        }
        debug!("mark_function: chained function calls '{}'", list.text(pc));
    }

    // Assume a call until proven otherwise.
    if list.kind(pc) == TokenKind::Function {
        list.set_kind(
            pc,
            if list.parent(pc) == TokenKind::Operator {
                TokenKind::FuncDef
            } else {
                TokenKind::FuncCall
            },
        );
    }

    // C++ constructor/destructor: Class::Class or ~Class.
    if list.kind(pc) == TokenKind::FuncClass
        || matches!(kind_of(list, prev), TokenKind::DcMember | TokenKind::Inv)
    {
        let mut destr = false;
        if kind_of(list, prev) == TokenKind::Inv {
            let p = prev.unwrap();
            list.set_kind(p, TokenKind::Destructor);
            list.set_kind(pc, TokenKind::FuncClass);
            list.set_parent(pc, TokenKind::Destructor);
            destr = true;
            prev = list.prev_nnl_np(p);
        }

        if kind_of(list, prev) == TokenKind::DcMember {
            let mut p = list.prev_nnl_np(prev.unwrap());
            p = skip_template_prev(list, p);
            p = skip_attribute_prev(list, p);
            if matches!(kind_of(list, p), TokenKind::Word | TokenKind::Type) {
                let class_name = p.unwrap();
                if list.text(class_name) == list.text(pc) {
                    list.set_kind(pc, TokenKind::FuncClass);
                    debug!(
                        "mark_function: found {} for '{}'",
                        if destr { "destructor" } else { "constructor" },
                        list.text(class_name)
                    );
                    mark_cpp_constructor(list, lang, pc);
                    return;
                }
                prev = list.prev_nnl_np(class_name);
            }
        }
    }

    // A def can only occur at brace level (or wrapped in one macro).
    if list.kind(pc) == TokenKind::FuncCall
        && (list.level(pc) == list.get(pc).brace_level || list.level(pc) == 1)
        && !list.flags(pc).contains(ChunkFlags::IN_ARRAY_ASSIGN)
    {
        let mut isa_def = false;
        let mut hit_star = false;
        let mut cursor = prev;

        while let Some(p) = cursor {
            let kind = list.kind(p);

            if kind == TokenKind::FParenClose && list.parent(p) == TokenKind::Attribute {
                cursor = skip_attribute_prev(list, Some(p));
                continue;
            }

            // const(TYPE) in D is a sure sign of a return type.
            if kind == TokenKind::ParenClose && list.parent(p) == TokenKind::DCast {
                isa_def = true;
                cursor = Some(p);
                break;
            }

            if matches!(kind, TokenKind::DcMember | TokenKind::Member) {
                let before = list.prev_nnl_np(p);
                if !matches!(
                    kind_of(list, before),
                    TokenKind::Word | TokenKind::Type | TokenKind::This
                ) {
                    list.set_kind(pc, TokenKind::FuncCall);
                    isa_def = false;
                    cursor = before;
                    break;
                }
                cursor = before.and_then(|b| list.prev_nnl_np(b));
                continue;
            }

            if matches!(kind, TokenKind::Type | TokenKind::Word) {
                if !hit_star {
                    isa_def = true;
                    cursor = Some(p);
                    break;
                }
                isa_def = true;
            }

            if list.is_addr(p) || list.is_star(p) {
                hit_star = true;
            }

            if !matches!(
                kind,
                TokenKind::Operator
                    | TokenKind::TSquare
                    | TokenKind::AngleClose
                    | TokenKind::Qualifier
                    | TokenKind::Type
                    | TokenKind::Word
            ) && !list.is_addr(p)
                && !list.is_star(p)
            {
                // Certain tokens never precede a proto or def.
                if matches!(
                    kind,
                    TokenKind::Arith
                        | TokenKind::Assign
                        | TokenKind::Comma
                        | TokenKind::Str
                        | TokenKind::StrMulti
                        | TokenKind::Number
                        | TokenKind::NumberFp
                ) {
                    isa_def = false;
                }
                cursor = Some(p);
                break;
            }

            cursor = if kind == TokenKind::AngleClose {
                skip_template_prev(list, Some(p))
            } else {
                list.prev_nnl_np(p)
            };
        }

        if isa_def {
            if let Some(p) = cursor {
                let pk = list.kind(p);
                if (list.is_paren_close(p) && list.parent(p) != TokenKind::DCast)
                    || pk == TokenKind::Assign
                    || pk == TokenKind::Return
                {
                    debug!("mark_function: overriding def due to {:?}", pk);
                    isa_def = false;
                }
            }
        }
        if isa_def {
            list.set_kind(pc, TokenKind::FuncDef);
            let from = match cursor {
                Some(c) => list.next_nnl(c, Nav::All),
                None => list.head(),
            };
            let mut t = from;
            while let Some(id) = t {
                if id == pc {
                    break;
                }
                make_type(list, id);
                t = list.next_nnl(id, Nav::All);
            }
        }
    }

    if list.kind(pc) != TokenKind::FuncDef {
        debug!(
            "mark_function: detected {:?} '{}'",
            list.kind(pc),
            list.text(pc)
        );
        let after = flag_parens(
            list,
            paren_open,
            ChunkFlags::IN_FCN_CALL,
            Some(TokenKind::FParenOpen),
            TokenKind::FuncCall,
            false,
        );
        if let Some(a) = after {
            if list.kind(a) == TokenKind::BraceOpen {
                let k = list.kind(pc);
                set_paren_parent(list, a, k);
            }
        }
        return;
    }

    // Def or proto: scan past the close paren for '{' or ';'.
    let mut semi: Option<ChunkId> = None;
    let mut tmp = list.next_nnl(paren_close, Nav::All);
    while let Some(t) = tmp {
        if list.level(t) < list.level(pc) {
            // No semicolon: guess prototype.
            list.set_kind(pc, TokenKind::FuncProto);
            break;
        }
        if list.level(t) == list.level(pc) {
            if list.kind(t) == TokenKind::BraceOpen {
                break; // definition for sure
            }
            if list.is_semicolon(t) {
                semi = Some(t);
                list.set_kind(pc, TokenKind::FuncProto);
                break;
            }
            if list.kind(t) == TokenKind::Comma {
                // Another declarator follows: C++ direct-init var.
                list.set_kind(pc, TokenKind::FuncCtorVar);
                debug!("mark_function: '{}' is a ctor-var (comma)", list.text(pc));
                break;
            }
        }
        tmp = list.next_nnl(t, Nav::All);
    }

    // A C++ 'prototype' inside a function body whose args cannot be a
    // parameter list is really a variable with constructor args.
    if lang & LANG_CPP != 0
        && list.kind(pc) == TokenKind::FuncProto
        && list.parent(pc) != TokenKind::Operator
    {
        let mut is_param = true;
        let mut reference = list.next_nnl(paren_open, Nav::All);
        let mut walk = reference;
        while let Some(t) = walk {
            if t == paren_close {
                break;
            }
            let t2 = list.next_nnl(t, Nav::All);
            if list.kind(t) == TokenKind::Comma && list.level(t) == list.level(paren_open) + 1 {
                if !can_be_full_param(list, lang, reference.unwrap(), t) {
                    is_param = false;
                    break;
                }
                reference = t2;
            }
            walk = t2;
        }
        if is_param {
            if let (Some(r), true) = (reference, reference != Some(paren_close)) {
                if r != paren_close && !can_be_full_param(list, lang, r, paren_close) {
                    is_param = false;
                }
            }
        }
        if !is_param {
            list.set_kind(pc, TokenKind::FuncCtorVar);
            debug!("mark_function: '{}' is a ctor-var (args)", list.text(pc));
        } else if list.get(pc).brace_level > 0 {
            // Inside another function body, "FOO foo();" declares a
            // variable unless the enclosing brace is a class or
            // namespace.
            let target = list.get(pc).brace_level - 1;
            let mut br_open = list.prev(pc, Nav::All);
            while let Some(b) = br_open {
                if list.kind(b) == TokenKind::BraceOpen && list.get(b).brace_level == target {
                    break;
                }
                br_open = list.prev(b, Nav::All);
            }
            if let Some(b) = br_open {
                if list.parent(b) != TokenKind::Extern && list.parent(b) != TokenKind::Namespace {
                    let p2 = list.prev_nnl(pc, Nav::All);
                    let starred = p2
                        .map(|p| list.is_str(p, "*") || list.is_str(p, "&"))
                        .unwrap_or(false);
                    if !starred
                        && !matches!(
                            list.parent(b),
                            TokenKind::Class | TokenKind::Struct | TokenKind::Namespace
                        )
                    {
                        list.set_kind(pc, TokenKind::FuncCtorVar);
                        debug!(
                            "mark_function: '{}' is a ctor-var (in body)",
                            list.text(pc)
                        );
                    }
                }
            }
        }
    }

    if let Some(s) = semi {
        let k = list.kind(pc);
        list.set_parent(s, k);
    }

    let fkind = list.kind(pc);
    flag_parens(
        list,
        paren_open,
        ChunkFlags::IN_FCN_DEF,
        Some(TokenKind::FParenOpen),
        fkind,
        false,
    );

    if fkind == TokenKind::FuncCtorVar {
        list.add_flags(pc, ChunkFlags::VAR_DEF);
        return;
    }

    if kind_of(list, next) == TokenKind::TSquare {
        next = next.and_then(|n| list.next_nnl(n, Nav::All));
    }

    if let Some(n) = next {
        fix_fcn_def_params(list, lang, n);
    }
    let before = list.prev_nnl(pc, Nav::All);
    mark_function_return_type(list, pc, before, fkind);

    if list.kind(pc) == TokenKind::FuncDef {
        let tmp = list.next_nnl(paren_close, Nav::SkipPreproc);
        if let Some(t) = tmp {
            if list.kind(t) == TokenKind::BraceOpen {
                list.set_parent(t, TokenKind::FuncDef);
                if let Some(c) = list.skip_to_match(t, Nav::All) {
                    list.set_parent(c, TokenKind::FuncDef);
                }
            }
        }
    }
    let _ = filename;
}

/// Marks a constructor/destructor: parameters, init-list ctor-vars,
/// and DEF/PROTO on the name.
pub(crate) fn mark_cpp_constructor(list: &mut ChunkList, lang: LangMask, pc: ChunkId) {
    if let Some(tmp) = list.prev_nnl(pc, Nav::All) {
        if list.kind(tmp) == TokenKind::Inv {
            list.set_kind(tmp, TokenKind::Destructor);
            list.set_parent(pc, TokenKind::Destructor);
        }
    }

    let paren_open = skip_template_next(list, list.next_nnl(pc, Nav::All));
    let Some(paren_open) = paren_open else { return };
    if !list.is_str(paren_open, "(") {
        warn!(
            "{}: expected '(' after constructor name, got '{}'",
            list.get(paren_open).line,
            list.text(paren_open)
        );
        return;
    }

    fix_fcn_def_params(list, lang, paren_open);
    flag_parens(
        list,
        paren_open,
        ChunkFlags::IN_FCN_CALL,
        Some(TokenKind::FParenOpen),
        TokenKind::FuncClass,
        false,
    );

    // Scan to the brace open, flagging the initializer list.
    let mut hit_colon = false;
    let mut tmp = Some(paren_open);
    while let Some(t) = tmp {
        if list.kind(t) == TokenKind::BraceOpen || list.is_semicolon(t) {
            break;
        }
        list.add_flags(t, ChunkFlags::IN_CONST_ARGS);
        tmp = list.next_nnl(t, Nav::All);
        if let Some(t2) = tmp {
            if list.is_str(t2, ":") && list.level(t2) == list.level(paren_open) {
                list.set_kind(t2, TokenKind::ConstrColon);
                hit_colon = true;
            }
            if hit_colon
                && (list.is_paren_open(t2) || list.is_opening_brace(t2))
                && list.level(t2) == list.level(paren_open)
            {
                let var = skip_template_prev(list, list.prev_nnl(t2, Nav::All));
                if let Some(v) = var {
                    if matches!(list.kind(v), TokenKind::Type | TokenKind::Word) {
                        list.set_kind(v, TokenKind::FuncCtorVar);
                        flag_parens(
                            list,
                            t2,
                            ChunkFlags::IN_FCN_CALL,
                            Some(TokenKind::FParenOpen),
                            TokenKind::FuncCtorVar,
                            false,
                        );
                    }
                }
            }
        }
    }
    match tmp {
        Some(t) if list.kind(t) == TokenKind::BraceOpen => {
            set_paren_parent(list, t, TokenKind::FuncClass);
            list.add_flags(pc, ChunkFlags::DEF);
        }
        _ => {
            list.add_flags(pc, ChunkFlags::PROTO);
        }
    }
}

/// On 'class'/'struct': find the class name, flag the body, and mark
/// member functions whose name matches the class as ctors/dtors.
pub(crate) fn mark_class_ctor(list: &mut ChunkList, lang: LangMask, start: ChunkId) {
    let mut pclass = match list.next_nnl(start, Nav::SkipPreproc) {
        Some(p) if matches!(list.kind(p), TokenKind::Type | TokenKind::Word) => p,
        _ => return,
    };

    // Skip to the last name of "class a::b::c".
    let mut next = list.next_nnl(pclass, Nav::SkipPreproc);
    while let Some(n) = next {
        if !matches!(
            list.kind(n),
            TokenKind::Type | TokenKind::Word | TokenKind::DcMember
        ) {
            break;
        }
        pclass = n;
        next = list.next_nnl(n, Nav::SkipPreproc);
    }

    let Some(mut pc) = list.next_nnl(pclass, Nav::SkipPreproc) else {
        debug!("mark_class_ctor: '{}' bailed on null", list.text(pclass));
        return;
    };
    let level = list.get(pclass).brace_level + 1;

    let mut names: Vec<ChunkId> = vec![pclass];

    // D template class: "class foo(T) { }"
    if lang & LANG_D != 0 {
        if let Some(n) = next {
            if list.kind(n) == TokenKind::ParenOpen {
                list.set_parent(n, TokenKind::Template);
                if let Some(close) = list.skip_to_match(n, Nav::SkipPreproc) {
                    list.set_parent(close, TokenKind::Template);
                    let mut t = list.next_nnl(n, Nav::SkipPreproc);
                    while let Some(id) = t {
                        if id == close {
                            break;
                        }
                        if list.kind(id) == TokenKind::Word {
                            make_type(list, id);
                            names.push(id);
                        }
                        t = list.next_nnl(id, Nav::SkipPreproc);
                    }
                }
            }
        }
    }

    // Find the open brace; a semicolon means prototype.
    let mut flags = ChunkFlags::NONE;
    loop {
        if list.is_str(pc, ":") {
            list.set_kind(pc, TokenKind::ClassColon);
            flags |= ChunkFlags::IN_CLASS_BASE;
        }
        if list.is_semicolon(pc) {
            list.add_flags(pclass, ChunkFlags::PROTO);
            return;
        }
        if list.kind(pc) == TokenKind::BraceOpen {
            break;
        }
        list.add_flags(pc, flags);
        match list.next_nnl(pc, Nav::SkipPreproc) {
            Some(n) => pc = n,
            None => return,
        }
    }

    list.add_flags(pclass, ChunkFlags::DEF);

    let start_kind = list.kind(start);
    set_paren_parent(list, pc, start_kind);

    let mut cur = list.next_nnl(pc, Nav::SkipPreproc);
    while let Some(id) = cur {
        list.add_flags(id, ChunkFlags::IN_CLASS);

        if list.get(id).brace_level > level || list.flags(id).contains(ChunkFlags::IN_PREPROC) {
            cur = list.next_nnl(id, Nav::All);
            continue;
        }

        if list.kind(id) == TokenKind::BraceClose && list.get(id).brace_level < level {
            if let Some(n) = list.next_nnl(id, Nav::SkipPreproc) {
                if list.kind(n) == TokenKind::Semicolon {
                    list.set_parent(n, start_kind);
                }
            }
            return;
        }

        let next = list.next_nnl(id, Nav::SkipPreproc);
        let name_match = names.iter().any(|&n| list.text(n) == list.text(id))
            && matches!(list.kind(id), TokenKind::Word | TokenKind::Type | TokenKind::Function);
        if name_match {
            if next.map(|n| list.is_str(n, "(")).unwrap_or(false) {
                list.set_kind(id, TokenKind::FuncClass);
                debug!("mark_class_ctor: marked ctor/dtor '{}'", list.text(id));
                mark_cpp_constructor(list, lang, id);
            } else {
                make_type(list, id);
            }
        }
        cur = next;
    }
}

/// On 'namespace': flag the braced body; `using namespace` is a
/// reference, a named namespace a definition.
pub(crate) fn mark_namespace(list: &mut ChunkList, pns: ChunkId) {
    let is_using = list
        .prev_nnl(pns, Nav::All)
        .map(|p| list.kind(p) == TokenKind::Using)
        .unwrap_or(false);
    if is_using {
        list.set_parent(pns, TokenKind::Using);
    }

    let mut pc = list.next_nnl(pns, Nav::All);
    if let Some(p) = pc {
        if list.kind(p) == TokenKind::Word {
            list.add_flags(
                p,
                if is_using {
                    ChunkFlags::REF
                } else {
                    ChunkFlags::DEF
                },
            );
        }
    }
    while let Some(p) = pc {
        list.set_parent(p, TokenKind::Namespace);
        if list.kind(p) != TokenKind::BraceOpen {
            if list.kind(p) == TokenKind::Semicolon {
                if is_using {
                    list.set_parent(p, TokenKind::Using);
                }
                return;
            }
            pc = list.next_nnl(p, Nav::All);
            continue;
        }
        flag_parens(
            list,
            p,
            ChunkFlags::IN_NAMESPACE,
            None,
            TokenKind::Namespace,
            false,
        );
        return;
    }
}
