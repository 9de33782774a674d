//! cindex: a fuzzy lexical indexer for C-family source code.
//!
//! Produces a queryable catalog of identifier definitions,
//! declarations, and references together with their scope path
//! (`ns:Class:method()`), without compiling anything: no include
//! resolution, no preprocessor evaluation, no template instantiation.
//! Classification is deterministic heuristics over a per-file token
//! stream, robust to missing context.
//!
//! The pipeline per file: tokenize -> token cleanup -> brace/statement
//! tracking -> semantic re-labeling -> scope assignment -> emission.

pub mod analyzer;
pub mod chunk;
pub mod cli;
pub mod combine;
pub mod error;
pub mod index;
pub mod lang;
pub mod lex;
pub mod output;
pub mod parse;
pub mod scope;
pub mod token;

pub use analyzer::{analyze_bytes, analyze_file, content_digest, FileAnalysis};
pub use chunk::{Chunk, ChunkId, ChunkList, Nav};
pub use error::{IndexerError, Result};
pub use index::{IndexStats, LookupRow, PrepareOutcome, SqliteIndex};
pub use lang::{language_from_path, language_from_tag, LangMask};
pub use output::{dump_tokens, emit_records, Record};
pub use token::{ChunkFlags, IdKind, IdSubKind, TokenKind};
