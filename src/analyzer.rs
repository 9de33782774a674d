//! Per-file pipeline orchestration.
//!
//! A file's byte buffer runs through the five stages in order; the
//! chunk list lives exactly as long as the pipeline and the emitted
//! records are the only output. Files are independent: the analyzer
//! holds no cross-file state, so the driver may process files in
//! parallel.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::info;

use crate::chunk::ChunkList;
use crate::combine;
use crate::error::Result;
use crate::lang::{self, LangMask};
use crate::lex;
use crate::output::{self, Record};
use crate::parse;
use crate::scope;

/// Result of analyzing one file.
#[derive(Debug)]
pub struct FileAnalysis {
    pub digest: String,
    pub language: LangMask,
    pub records: Vec<Record>,
}

/// SHA-256 of the raw buffer, hex-encoded. Drives change detection in
/// the index.
pub fn content_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Runs the five stages over a buffer and returns the finished chunk
/// stream. [`analyze_bytes`] is the record-producing wrapper.
pub fn parse_chunks(
    data: &[u8],
    lang: LangMask,
    tab_size: u32,
    filename: &str,
) -> Result<ChunkList> {
    let mut list = ChunkList::with_capacity(data.len() / 4);
    lex::tokenize(data, lang, tab_size, filename, &mut list)?;
    parse::tokenize_cleanup(&mut list, lang);
    parse::brace_cleanup(&mut list, lang, filename)?;
    combine::fix_symbols(&mut list, lang, filename);
    combine::combine_labels(&mut list, lang, filename);
    scope::assign_scope(&mut list);
    Ok(list)
}

/// Analyzes an in-memory buffer under the given language mask.
pub fn analyze_bytes(
    data: &[u8],
    lang: LangMask,
    tab_size: u32,
    filename: &str,
) -> Result<FileAnalysis> {
    let list = parse_chunks(data, lang, tab_size, filename)?;
    Ok(FileAnalysis {
        digest: content_digest(data),
        language: lang,
        records: output::emit_records(&list),
    })
}

/// Reads and analyzes a file; the language comes from the extension
/// unless forced.
pub fn analyze_file(path: &Path, forced_lang: LangMask, tab_size: u32) -> Result<FileAnalysis> {
    let data = std::fs::read(path)?;
    let lang = if forced_lang == lang::LANG_NONE {
        lang::language_from_path(path)
    } else {
        forced_lang
    };
    let filename = path.to_string_lossy();
    info!(
        "parsing {} as language {}",
        filename,
        lang::language_to_string(lang)
    );
    analyze_bytes(&data, lang, tab_size, &filename)
}

/// Like [`analyze_file`] but returns the finished chunk stream, for
/// the `--dump` debug surface.
pub fn dump_file(path: &Path, forced_lang: LangMask, tab_size: u32) -> Result<ChunkList> {
    let data = std::fs::read(path)?;
    let lang = if forced_lang == lang::LANG_NONE {
        lang::language_from_path(path)
    } else {
        forced_lang
    };
    parse_chunks(&data, lang, tab_size, &path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::LANG_C;
    use crate::token::{IdKind, IdSubKind};

    #[test]
    fn digest_is_stable_hex() {
        let d = content_digest(b"hello");
        assert_eq!(d.len(), 64);
        assert_eq!(d, content_digest(b"hello"));
        assert_ne!(d, content_digest(b"hello "));
    }

    #[test]
    fn reanalysis_is_idempotent() {
        let src = b"int foo(void) { return bar(); }\n";
        let a = analyze_bytes(src, LANG_C, 8, "t.c").unwrap();
        let b = analyze_bytes(src, LANG_C, 8, "t.c").unwrap();
        let fa: Vec<String> = a.records.iter().map(|r| r.format("t.c")).collect();
        let fb: Vec<String> = b.records.iter().map(|r| r.format("t.c")).collect();
        assert_eq!(fa, fb);
    }

    #[test]
    fn records_are_ordered() {
        let src = b"int a;\nint b;\nvoid f(void) { a = b; }\n";
        let out = analyze_bytes(src, LANG_C, 8, "t.c").unwrap();
        let mut last = (0u32, 0u32);
        for r in &out.records {
            assert!((r.line, r.column) >= last, "records out of order");
            last = (r.line, r.column);
        }
    }

    #[test]
    fn function_def_and_call() {
        let src = b"int foo(void) { return bar(); }\n";
        let out = analyze_bytes(src, LANG_C, 8, "t.c").unwrap();
        let foo = out.records.iter().find(|r| r.name == "foo").unwrap();
        assert_eq!(foo.kind, IdKind::Function);
        assert_eq!(foo.sub_kind, IdSubKind::Definition);
        let bar = out.records.iter().find(|r| r.name == "bar").unwrap();
        assert_eq!(bar.kind, IdKind::Function);
        assert_eq!(bar.sub_kind, IdSubKind::Reference);
        assert_eq!(bar.scope, "foo{}");
    }
}
