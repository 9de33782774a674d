//! Driver-level integration: analyze real files on disk into the
//! SQLite index, exercise digest skipping, lookup, and pruning.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tempfile::TempDir;

use cindex::analyzer::analyze_file;
use cindex::lang::LANG_NONE;
use cindex::token::IdSubKind;
use cindex::{PrepareOutcome, SqliteIndex};

fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write failed");
    path
}

fn index_one(index: &SqliteIndex, path: &Path) -> bool {
    let analysis = analyze_file(path, LANG_NONE, 8).expect("analysis failed");
    let path_str = path.to_string_lossy();
    match index
        .prepare_file(&path_str, &analysis.digest)
        .expect("prepare failed")
    {
        PrepareOutcome::Unchanged => false,
        PrepareOutcome::Changed { file_id } => {
            index
                .insert_records(file_id, &analysis.records)
                .expect("insert failed");
            true
        }
    }
}

#[test]
fn index_roundtrip_on_disk() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("TOKS.db");
    let src = write_file(
        tmp.path(),
        "events.c",
        "int print_event_filter(void);\n\nint print_event_filter(void)\n{\n    return 0;\n}\n",
    );

    let index = SqliteIndex::new(&db_path).unwrap();
    assert!(index_one(&index, &src));
    assert!(db_path.exists());

    let rows = index
        .lookup("print_event_filter", &[IdSubKind::Definition])
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].line, 3);
    assert_eq!(rows[0].scope, "<global>");

    let rows = index
        .lookup("print_event_filter", &[IdSubKind::Declaration])
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].line, 1);
}

#[test]
fn unchanged_digest_skips_reanalysis() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("TOKS.db");
    let src = write_file(tmp.path(), "a.c", "int foo(void) { return 1; }\n");

    let index = SqliteIndex::new(&db_path).unwrap();
    assert!(index_one(&index, &src), "first pass analyzes");
    assert!(!index_one(&index, &src), "second pass skips");

    // Touching the content re-analyzes and replaces rows.
    write_file(tmp.path(), "a.c", "int bar(void) { return 2; }\n");
    assert!(index_one(&index, &src));
    assert!(index.lookup("foo", &[IdSubKind::Definition]).unwrap().is_empty());
    assert_eq!(
        index.lookup("bar", &[IdSubKind::Definition]).unwrap().len(),
        1
    );
}

#[test]
fn index_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("TOKS.db");
    let src = write_file(tmp.path(), "a.c", "int foo(void) { return 1; }\n");

    {
        let index = SqliteIndex::new(&db_path).unwrap();
        index_one(&index, &src);
    }

    let index = SqliteIndex::new(&db_path).unwrap();
    let rows = index.lookup("foo", &[IdSubKind::Definition]).unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn wildcard_lookup_across_files() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("TOKS.db");
    let a = write_file(tmp.path(), "a.c", "void event_start(void) { }\n");
    let b = write_file(tmp.path(), "b.c", "void event_stop(void) { }\n");

    let index = SqliteIndex::new(&db_path).unwrap();
    index_one(&index, &a);
    index_one(&index, &b);

    let rows = index.lookup("event_*", &[IdSubKind::Definition]).unwrap();
    assert_eq!(rows.len(), 2);
    // Deterministic order: by path, line, column.
    assert!(rows[0].file <= rows[1].file);
}

#[test]
fn pruning_removes_deleted_files() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("TOKS.db");
    let a = write_file(tmp.path(), "a.c", "int foo(void) { return 1; }\n");
    let b = write_file(tmp.path(), "b.c", "int bar(void) { return 2; }\n");

    let index = SqliteIndex::new(&db_path).unwrap();
    index_one(&index, &a);
    index_one(&index, &b);

    fs::remove_file(&a).unwrap();
    let present: HashSet<String> = index
        .paths()
        .unwrap()
        .into_iter()
        .filter(|p| Path::new(p).exists())
        .collect();
    assert_eq!(index.prune_missing(&present).unwrap(), 1);

    assert!(index.lookup("foo", &[IdSubKind::Definition]).unwrap().is_empty());
    assert_eq!(
        index.lookup("bar", &[IdSubKind::Definition]).unwrap().len(),
        1
    );
}

#[test]
fn stats_reflect_contents() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("TOKS.db");
    let src = write_file(
        tmp.path(),
        "a.c",
        "int foo(void);\nint foo(void) { return bar(); }\n",
    );

    let index = SqliteIndex::new(&db_path).unwrap();
    index_one(&index, &src);

    let stats = index.stats().unwrap();
    assert_eq!(stats.files, 1);
    assert!(stats.definitions >= 1);
    assert!(stats.declarations >= 1);
    assert!(stats.references >= 1);
}
