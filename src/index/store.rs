//! The persistent index.
//!
//! A single SQLite file: `files(path, digest)` plus one table per
//! sub-kind (`definitions`, `declarations`, `references`), each
//! holding `(file_id, line, column, scope, kind, name)`. A version
//! table guards the format; re-analysis of an unchanged digest is
//! skipped at this layer.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::debug;

use crate::error::{IndexerError, Result};
use crate::output::Record;
use crate::token::IdSubKind;

const INDEX_VERSION: i64 = 1;

const SUB_KINDS: [IdSubKind; 3] = [
    IdSubKind::Definition,
    IdSubKind::Declaration,
    IdSubKind::Reference,
];

/// What `prepare_file` decided about a file.
#[derive(Debug, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// Same digest: skip re-analysis.
    Unchanged,
    /// New or changed: old rows are pruned, insert under this id.
    Changed { file_id: i64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupRow {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub scope: String,
    pub kind: String,
    pub sub_kind: &'static str,
    pub name: String,
}

impl LookupRow {
    pub fn format(&self) -> String {
        format!(
            "{}:{}:{} {} {} {} {}",
            self.file, self.line, self.column, self.scope, self.kind, self.sub_kind, self.name
        )
    }
}

#[derive(Debug, Default)]
pub struct IndexStats {
    pub files: u64,
    pub definitions: u64,
    pub declarations: u64,
    pub references: u64,
}

pub struct SqliteIndex {
    conn: Mutex<Connection>,
}

impl SqliteIndex {
    pub fn new(db_path: impl AsRef<Path>) -> Result<SqliteIndex> {
        let conn = Connection::open(db_path)?;
        Self::configure_pragmas(&conn)?;
        let index = SqliteIndex {
            conn: Mutex::new(conn),
        };
        index.init_schema()?;
        Ok(index)
    }

    pub fn in_memory() -> Result<SqliteIndex> {
        let conn = Connection::open_in_memory()?;
        Self::configure_pragmas(&conn)?;
        let index = SqliteIndex {
            conn: Mutex::new(conn),
        };
        index.init_schema()?;
        Ok(index)
    }

    fn configure_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            "#,
        )?;
        Ok(())
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let version: Option<i64> = conn
            .query_row("SELECT version FROM version", [], |row| row.get(0))
            .optional()
            .unwrap_or(None);
        match version {
            Some(v) if v != INDEX_VERSION => {
                return Err(IndexerError::IndexVersion {
                    found: v,
                    expected: INDEX_VERSION,
                });
            }
            Some(_) => return Ok(()),
            None => {}
        }

        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS version(version INTEGER);
            INSERT INTO version VALUES({INDEX_VERSION});

            CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY,
                path TEXT NOT NULL UNIQUE,
                digest TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS "definitions" (
                file_id INTEGER REFERENCES files(id) ON DELETE CASCADE,
                line INTEGER NOT NULL,
                column INTEGER NOT NULL,
                scope TEXT NOT NULL,
                kind TEXT NOT NULL,
                name TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_definitions_name ON "definitions"(name);
            CREATE INDEX IF NOT EXISTS idx_definitions_file ON "definitions"(file_id);

            CREATE TABLE IF NOT EXISTS "declarations" (
                file_id INTEGER REFERENCES files(id) ON DELETE CASCADE,
                line INTEGER NOT NULL,
                column INTEGER NOT NULL,
                scope TEXT NOT NULL,
                kind TEXT NOT NULL,
                name TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_declarations_name ON "declarations"(name);
            CREATE INDEX IF NOT EXISTS idx_declarations_file ON "declarations"(file_id);

            CREATE TABLE IF NOT EXISTS "references" (
                file_id INTEGER REFERENCES files(id) ON DELETE CASCADE,
                line INTEGER NOT NULL,
                column INTEGER NOT NULL,
                scope TEXT NOT NULL,
                kind TEXT NOT NULL,
                name TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_references_name ON "references"(name);
            CREATE INDEX IF NOT EXISTS idx_references_file ON "references"(file_id);
            "#
        ))?;
        Ok(())
    }

    /// Registers a file, comparing digests. An unchanged digest means
    /// the caller can skip analysis entirely; a changed one prunes the
    /// stale rows first.
    pub fn prepare_file(&self, path: &str, digest: &str) -> Result<PrepareOutcome> {
        let conn = self.conn.lock().unwrap();

        let existing: Option<(i64, String)> = conn
            .query_row(
                "SELECT id, digest FROM files WHERE path = ?1",
                params![path],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match existing {
            Some((id, old_digest)) => {
                if old_digest == digest {
                    debug!("{path}: digest unchanged, skipping");
                    return Ok(PrepareOutcome::Unchanged);
                }
                debug!("{path}: digest changed, pruning");
                conn.execute(
                    "UPDATE files SET digest = ?1 WHERE id = ?2",
                    params![digest, id],
                )?;
                for sub in SUB_KINDS {
                    conn.execute(
                        &format!("DELETE FROM \"{}\" WHERE file_id = ?1", sub.table()),
                        params![id],
                    )?;
                }
                Ok(PrepareOutcome::Changed { file_id: id })
            }
            None => {
                conn.execute(
                    "INSERT INTO files (path, digest) VALUES (?1, ?2)",
                    params![path, digest],
                )?;
                let id = conn.last_insert_rowid();
                Ok(PrepareOutcome::Changed { file_id: id })
            }
        }
    }

    /// Inserts a file's records in a single transaction.
    pub fn insert_records(&self, file_id: i64, records: &[Record]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for sub in SUB_KINDS {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO \"{}\" (file_id, line, column, scope, kind, name) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                sub.table()
            ))?;
            for r in records.iter().filter(|r| r.sub_kind == sub) {
                stmt.execute(params![
                    file_id,
                    r.line,
                    r.column,
                    r.scope,
                    r.kind.as_str(),
                    r.name
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// All file paths currently registered in the index.
    pub fn paths(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT path FROM files")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut paths = Vec::new();
        for row in rows {
            paths.push(row?);
        }
        Ok(paths)
    }

    /// Drops files (and their rows) that are no longer part of the
    /// indexed set.
    pub fn prune_missing(&self, present: &HashSet<String>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let stale: Vec<(i64, String)> = {
            let mut stmt = conn.prepare("SELECT id, path FROM files")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.filter_map(|r| r.ok())
                .filter(|(_, path)| !present.contains(path))
                .collect()
        };
        for (id, path) in &stale {
            debug!("pruning {path} from index");
            for sub in SUB_KINDS {
                conn.execute(
                    &format!("DELETE FROM \"{}\" WHERE file_id = ?1", sub.table()),
                    params![id],
                )?;
            }
            conn.execute("DELETE FROM files WHERE id = ?1", params![id])?;
        }
        Ok(stale.len())
    }

    /// Looks up identifiers by name; `*` and `?` wildcards use
    /// SQLite's GLOB.
    pub fn lookup(&self, pattern: &str, subs: &[IdSubKind]) -> Result<Vec<LookupRow>> {
        let conn = self.conn.lock().unwrap();
        let glob = pattern.contains('*') || pattern.contains('?');
        let mut rows = Vec::new();

        for &sub in subs {
            let sql = format!(
                "SELECT f.path, t.line, t.column, t.scope, t.kind, t.name \
                 FROM \"{}\" t JOIN files f ON f.id = t.file_id \
                 WHERE t.name {} ?1 ORDER BY f.path, t.line, t.column",
                sub.table(),
                if glob { "GLOB" } else { "=" }
            );
            let mut stmt = conn.prepare(&sql)?;
            let found = stmt.query_map(params![pattern], |row| {
                Ok(LookupRow {
                    file: row.get(0)?,
                    line: row.get(1)?,
                    column: row.get(2)?,
                    scope: row.get(3)?,
                    kind: row.get(4)?,
                    sub_kind: sub.as_str(),
                    name: row.get(5)?,
                })
            })?;
            for row in found {
                rows.push(row?);
            }
        }
        Ok(rows)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let conn = self.conn.lock().unwrap();
        let count = |table: &str| -> Result<u64> {
            let n: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM \"{table}\""),
                [],
                |row| row.get(0),
            )?;
            Ok(n as u64)
        };
        Ok(IndexStats {
            files: count("files")?,
            definitions: count("definitions")?,
            declarations: count("declarations")?,
            references: count("references")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::IdKind;

    fn record(name: &str, sub: IdSubKind, line: u32) -> Record {
        Record {
            line,
            column: 1,
            scope: "<global>".to_string(),
            kind: IdKind::Function,
            sub_kind: sub,
            name: name.to_string(),
        }
    }

    #[test]
    fn digest_skip_and_replace() {
        let index = SqliteIndex::in_memory().unwrap();
        let out = index.prepare_file("a.c", "d1").unwrap();
        let PrepareOutcome::Changed { file_id } = out else {
            panic!("expected Changed");
        };
        index
            .insert_records(file_id, &[record("foo", IdSubKind::Definition, 1)])
            .unwrap();

        // Same digest: skip.
        assert_eq!(
            index.prepare_file("a.c", "d1").unwrap(),
            PrepareOutcome::Unchanged
        );

        // New digest: rows pruned, same file id reused.
        let out = index.prepare_file("a.c", "d2").unwrap();
        assert!(matches!(out, PrepareOutcome::Changed { .. }));
        let rows = index.lookup("foo", &[IdSubKind::Definition]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn lookup_exact_and_glob() {
        let index = SqliteIndex::in_memory().unwrap();
        let PrepareOutcome::Changed { file_id } = index.prepare_file("a.c", "d").unwrap() else {
            panic!();
        };
        index
            .insert_records(
                file_id,
                &[
                    record("foo_bar", IdSubKind::Definition, 1),
                    record("foo_baz", IdSubKind::Reference, 2),
                    record("other", IdSubKind::Definition, 3),
                ],
            )
            .unwrap();

        let rows = index.lookup("foo_bar", &[IdSubKind::Definition]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "foo_bar");

        let rows = index
            .lookup(
                "foo_*",
                &[IdSubKind::Definition, IdSubKind::Reference],
            )
            .unwrap();
        assert_eq!(rows.len(), 2);

        let rows = index.lookup("foo_ba?", &[IdSubKind::Definition]).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn prune_missing_drops_stale_files() {
        let index = SqliteIndex::in_memory().unwrap();
        let PrepareOutcome::Changed { file_id } = index.prepare_file("a.c", "d").unwrap() else {
            panic!();
        };
        index
            .insert_records(file_id, &[record("foo", IdSubKind::Definition, 1)])
            .unwrap();
        index.prepare_file("b.c", "d").unwrap();

        let mut present = HashSet::new();
        present.insert("b.c".to_string());
        assert_eq!(index.prune_missing(&present).unwrap(), 1);

        let stats = index.stats().unwrap();
        assert_eq!(stats.files, 1);
        assert_eq!(stats.definitions, 0);
    }

    #[test]
    fn stats_counts_tables() {
        let index = SqliteIndex::in_memory().unwrap();
        let PrepareOutcome::Changed { file_id } = index.prepare_file("a.c", "d").unwrap() else {
            panic!();
        };
        index
            .insert_records(
                file_id,
                &[
                    record("a", IdSubKind::Definition, 1),
                    record("b", IdSubKind::Declaration, 2),
                    record("c", IdSubKind::Reference, 3),
                ],
            )
            .unwrap();
        let stats = index.stats().unwrap();
        assert_eq!(stats.files, 1);
        assert_eq!(stats.definitions, 1);
        assert_eq!(stats.declarations, 1);
        assert_eq!(stats.references, 1);
    }
}
