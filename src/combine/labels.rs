//! Colon reclassification: every `:` in the stream gets a specific
//! role (ternary, case, label, class base, bit-field, Pawn tag,
//! designated initializer, for-colon, boxed dictionary).

use tracing::warn;

use crate::chunk::{ChunkId, ChunkList, Nav};
use crate::lang::{LangMask, LANG_PAWN};
use crate::token::{ChunkFlags, TokenKind};

pub fn combine_labels(list: &mut ChunkList, lang: LangMask, filename: &str) {
    let mut question_count = 0i32;
    let mut hit_case = false;
    let mut hit_class = false;

    let Some(head) = list.head() else { return };
    let mut prev = head;
    let Some(mut cur) = list.next(head, Nav::All) else {
        return;
    };
    let mut next_opt = list.next(cur, Nav::All);

    while let Some(next) = next_opt {
        let nk = list.kind(next);

        if !list.flags(next).contains(ChunkFlags::IN_OC_MSG)
            && matches!(nk, TokenKind::Class | TokenKind::OcClass | TokenKind::Template)
        {
            hit_class = true;
        }
        if list.is_semicolon(next) || nk == TokenKind::BraceOpen {
            hit_class = false;
        }

        if nk == TokenKind::Question {
            question_count += 1;
        } else if nk == TokenKind::Case {
            if list.kind(cur) == TokenKind::Goto {
                // goto case x;
                list.set_kind(next, TokenKind::Qualifier);
            } else {
                hit_case = true;
            }
        } else if nk == TokenKind::Colon {
            if list.kind(cur) == TokenKind::Default {
                list.set_kind(cur, TokenKind::Case);
                hit_case = true;
            }
            if question_count > 0 {
                list.set_kind(next, TokenKind::CondColon);
                question_count -= 1;
            } else if hit_case {
                hit_case = false;
                list.set_kind(next, TokenKind::CaseColon);
                if let Some(tmp) = list.next_nnl(next, Nav::All) {
                    if list.kind(tmp) == TokenKind::BraceOpen {
                        list.set_parent(tmp, TokenKind::Case);
                        if let Some(close) =
                            list.next_of_kind(tmp, TokenKind::BraceClose, list.level(tmp), Nav::All)
                        {
                            list.set_parent(close, TokenKind::Case);
                        }
                    }
                }
            } else {
                classify_colon(
                    list,
                    lang,
                    filename,
                    prev,
                    cur,
                    next,
                    hit_class,
                );
            }
        }

        prev = cur;
        cur = next;
        next_opt = list.next(cur, Nav::All);
    }
}

fn classify_colon(
    list: &mut ChunkList,
    lang: LangMask,
    filename: &str,
    prev: ChunkId,
    cur: ChunkId,
    next: ChunkId,
    hit_class: bool,
) {
    let nextprev = list.prev_nnl(next, Nav::All);
    let ck = list.kind(cur);

    if lang & LANG_PAWN != 0 {
        if matches!(ck, TokenKind::Word | TokenKind::BraceClose) {
            // Pawn tags vs labels: a label sits alone on its line.
            let tmp = list.next(next, Nav::All);
            let label = list.is_newline(prev)
                && tmp.map(|t| list.is_newline(t)).unwrap_or(false);
            if label {
                list.set_kind(next, TokenKind::LabelColon);
                if ck == TokenKind::Word {
                    list.set_kind(cur, TokenKind::Label);
                }
            } else {
                list.set_kind(next, TokenKind::TagColon);
                if ck == TokenKind::Word {
                    list.set_kind(cur, TokenKind::Tag);
                }
            }
        }
        return;
    }

    if list.flags(next).contains(ChunkFlags::IN_ARRAY_ASSIGN) {
        list.set_kind(next, TokenKind::DArrayColon);
    } else if list.flags(next).contains(ChunkFlags::IN_FOR) {
        list.set_kind(next, TokenKind::ForColon);
    } else if list.flags(next).contains(ChunkFlags::OC_BOXED) {
        list.set_kind(next, TokenKind::OcDictColon);
    } else if ck == TokenKind::Word {
        let tmp = list.next(next, Nav::SkipPreproc);
        if list.is_newline(prev)
            && tmp.map(|t| list.kind(t) != TokenKind::Number).unwrap_or(true)
        {
            list.set_kind(cur, TokenKind::Label);
            list.set_kind(next, TokenKind::LabelColon);
        } else if list.flags(next).contains(ChunkFlags::IN_FCN_CALL) {
            // A macro thing; assume some sort of label.
            list.set_kind(next, TokenKind::LabelColon);
        } else {
            list.set_kind(next, TokenKind::BitColon);
            let mut tmp = list.next(next, Nav::All);
            while let Some(t) = tmp {
                if list.kind(t) == TokenKind::Semicolon {
                    break;
                }
                if list.kind(t) == TokenKind::Colon {
                    list.set_kind(t, TokenKind::BitColon);
                }
                tmp = list.next(t, Nav::All);
            }
        }
    } else if nextprev.map(|p| list.kind(p) == TokenKind::FParenClose).unwrap_or(false) {
        // Member initializer list on a constructor.
        list.set_kind(next, TokenKind::ClassColon);
    } else if list.level(next) > list.get(next).brace_level {
        // Inside a paren; leave it alone.
    } else if ck == TokenKind::Type {
        list.set_kind(next, TokenKind::BitColon);
    } else if matches!(
        ck,
        TokenKind::Enum | TokenKind::Private | TokenKind::Qualifier
    ) || list.parent(cur) == TokenKind::Align
    {
        // Bit field, access specifier, or alignment: leave.
    } else if ck == TokenKind::AngleClose || hit_class {
        // Template thingy.
    } else if list.parent(next) == TokenKind::Assert {
        // Java assert message separator.
    } else {
        let tmp = list.next_nnl(next, Nav::All);
        let cs_base = tmp
            .map(|t| matches!(list.kind(t), TokenKind::Base | TokenKind::This))
            .unwrap_or(false);
        if !cs_base {
            warn!(
                "{}:{} unexpected colon in col {} n-parent={:?} c-parent={:?} l={} bl={}",
                filename,
                list.get(next).line,
                list.get(next).col,
                list.parent(next),
                list.parent(cur),
                list.level(next),
                list.get(next).brace_level,
            );
        }
    }
}
