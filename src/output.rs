//! Stage 5b: record emission.
//!
//! Classifies every surviving identifier chunk into an
//! `(id kind, sub kind)` pair. Keywords and punctuators are never
//! emitted. The textual format is
//! `FILE:LINE:COLUMN SCOPE KIND SUBKIND NAME`.

use std::io::Write;

use serde::Serialize;

use crate::chunk::{ChunkId, ChunkList};
use crate::error::Result;
use crate::token::{ChunkFlags, IdKind, IdSubKind, TokenKind};

/// One emitted identifier.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub line: u32,
    pub column: u32,
    pub scope: String,
    pub kind: IdKind,
    pub sub_kind: IdSubKind,
    pub name: String,
}

impl Record {
    pub fn format(&self, file: &str) -> String {
        format!(
            "{}:{}:{} {} {} {} {}",
            file,
            self.line,
            self.column,
            self.scope,
            self.kind.as_str(),
            self.sub_kind.as_str(),
            self.name
        )
    }
}

fn sub_from_flags(flags: ChunkFlags) -> IdSubKind {
    if flags.contains(ChunkFlags::DEF) {
        IdSubKind::Definition
    } else if flags.contains(ChunkFlags::PROTO) {
        IdSubKind::Declaration
    } else {
        // REF or nothing: the tame default.
        IdSubKind::Reference
    }
}

/// The classification table. `None` means the chunk is not emitted.
fn classify(list: &ChunkList, id: ChunkId) -> Option<(IdKind, IdSubKind)> {
    let flags = list.flags(id);
    if flags.intersects(ChunkFlags::PUNCTUATOR | ChunkFlags::KEYWORD) {
        return None;
    }

    let parent = list.parent(id);
    Some(match list.kind(id) {
        TokenKind::FuncDef => (IdKind::Function, IdSubKind::Definition),
        TokenKind::FuncProto => (IdKind::Function, IdSubKind::Declaration),
        TokenKind::FuncCall | TokenKind::FuncCallUser => (IdKind::Function, IdSubKind::Reference),
        TokenKind::FuncClass => (IdKind::Function, sub_from_flags(flags)),
        TokenKind::MacroFunc => (IdKind::MacroFunction, IdSubKind::Definition),
        TokenKind::Macro => (IdKind::Macro, IdSubKind::Definition),
        TokenKind::Type => {
            if parent == TokenKind::Typedef {
                let kind = if flags.contains(ChunkFlags::TYPEDEF_STRUCT) {
                    IdKind::StructType
                } else if flags.contains(ChunkFlags::TYPEDEF_UNION) {
                    IdKind::UnionType
                } else if flags.contains(ChunkFlags::TYPEDEF_ENUM) {
                    IdKind::EnumType
                } else {
                    IdKind::Type
                };
                (kind, IdSubKind::Definition)
            } else if matches!(
                parent,
                TokenKind::Struct | TokenKind::Union | TokenKind::Enum
            ) {
                let kind = match parent {
                    TokenKind::Struct => IdKind::Struct,
                    TokenKind::Union => IdKind::Union,
                    _ => IdKind::Enum,
                };
                (kind, sub_from_flags(flags))
            } else if parent == TokenKind::Class {
                (IdKind::Class, sub_from_flags(flags))
            } else {
                (IdKind::Type, IdSubKind::Reference)
            }
        }
        TokenKind::FuncType => (IdKind::FunctionType, IdSubKind::Definition),
        TokenKind::FuncCtorVar => (IdKind::Var, IdSubKind::Reference),
        TokenKind::FuncVar | TokenKind::Word => {
            if parent == TokenKind::None {
                if flags.contains(ChunkFlags::IN_ENUM) {
                    (IdKind::EnumVal, IdSubKind::Definition)
                } else if flags.contains(ChunkFlags::VAR_DEF) {
                    (IdKind::Var, IdSubKind::Definition)
                } else if flags.contains(ChunkFlags::VAR_DECL) {
                    (IdKind::Var, IdSubKind::Declaration)
                } else {
                    (IdKind::Identifier, IdSubKind::Reference)
                }
            } else if parent == TokenKind::Namespace {
                (IdKind::Namespace, sub_from_flags(flags))
            } else {
                return None;
            }
        }
        _ => return None,
    })
}

/// Runs the classification over the finished stream, in source order.
pub fn emit_records(list: &ChunkList) -> Vec<Record> {
    let mut records = Vec::new();
    for id in list.iter() {
        if let Some((kind, sub_kind)) = classify(list, id) {
            let c = list.get(id);
            records.push(Record {
                line: c.line,
                column: c.col,
                scope: c.scope.clone(),
                kind,
                sub_kind,
                name: c.text.clone(),
            });
        }
    }
    records
}

/// Writes the parsed stream for `--dump`: one line per chunk with
/// kind, parent, scope, columns, levels, and flag names.
pub fn dump_tokens(list: &ChunkList, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "# -=====-")?;
    writeln!(
        out,
        "# Line> Tag[Parent][Scope][Cols][Br/Lvl/pp] Flags Text"
    )?;
    for id in list.iter() {
        let c = list.get(id);
        let flags = c.flags.names().join(",");
        writeln!(
            out,
            "# {:4}> {:>14}[{:>10}][{:>10}][{}/{}][{}/{}/{}] [{}] {}",
            c.line,
            c.kind.to_string(),
            c.parent.to_string(),
            c.scope,
            c.col,
            c.col_end,
            c.brace_level,
            c.level,
            c.pp_level,
            flags,
            if c.kind == TokenKind::Newline {
                ""
            } else {
                c.text.as_str()
            },
        )?;
    }
    writeln!(out, "# -=====-")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_kind_defaults_to_reference() {
        assert_eq!(sub_from_flags(ChunkFlags::NONE), IdSubKind::Reference);
        assert_eq!(sub_from_flags(ChunkFlags::DEF), IdSubKind::Definition);
        assert_eq!(sub_from_flags(ChunkFlags::PROTO), IdSubKind::Declaration);
    }

    #[test]
    fn record_text_format() {
        let r = Record {
            line: 10,
            column: 5,
            scope: "<global>".to_string(),
            kind: IdKind::Function,
            sub_kind: IdSubKind::Declaration,
            name: "foo".to_string(),
        };
        assert_eq!(r.format("a.c"), "a.c:10:5 <global> FUNCTION DECL foo");
    }
}
