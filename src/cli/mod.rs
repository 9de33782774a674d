//! Command-line surface.
//!
//! Index mode (the default) analyzes the given files/directories into
//! the SQLite index, printing records as they are produced. Lookup
//! mode (`--id`) queries the index with shell-style wildcards,
//! restricted by `--defs`/`--decls`/`--refs`.

use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use ignore::WalkBuilder;
use rayon::prelude::*;
use tracing::{error, info};

use crate::analyzer::{self, content_digest, FileAnalysis};
use crate::error::{IndexerError, Result};
use crate::index::{PrepareOutcome, SqliteIndex};
use crate::lang::{self, LangMask, LANG_NONE};
use crate::output;
use crate::token::IdSubKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "cindex")]
#[command(about = "Fuzzy lexical indexer for C-family identifiers")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Index a couple of files
    cindex foo.c bar.cpp

    # Index a tree, forcing the language
    cindex -l CPP src/

    # Index files listed in a manifest (- reads stdin)
    cindex -F filelist.txt

    # Look up an identifier, wildcards allowed
    cindex --id 'parse_*' --defs

    # Dump the parsed token stream for debugging
    cindex -d foo.c
"#)]
pub struct Cli {
    /// Path to the index database
    #[arg(short = 'i', long = "db", default_value = "TOKS.db")]
    pub db: PathBuf,

    /// Language override: C, CPP, D, CS, JAVA, PAWN, OC, OC+, VALA, ECMA
    #[arg(short = 'l', long = "lang")]
    pub lang: Option<String>,

    /// Read files to process from a file, one per line (- is stdin)
    #[arg(short = 'F', long = "files-from")]
    pub files_from: Option<PathBuf>,

    /// Tab width used for column accounting
    #[arg(long, default_value_t = 8)]
    pub tab_size: u32,

    /// Dump the parsed token stream of each file (debug)
    #[arg(short = 'd', long)]
    pub dump: bool,

    /// Identifier to look up (supports * and ? wildcards)
    #[arg(long = "id")]
    pub id: Option<String>,

    /// Show only definitions
    #[arg(long)]
    pub defs: bool,

    /// Show only declarations
    #[arg(long)]
    pub decls: bool,

    /// Show only references
    #[arg(long)]
    pub refs: bool,

    /// Output format for lookup results
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Files or directories to index
    pub inputs: Vec<PathBuf>,
}

pub fn run(cli: &Cli) -> Result<()> {
    let forced = match &cli.lang {
        Some(tag) => lang::language_from_tag(tag)?,
        None => LANG_NONE,
    };

    let files = collect_inputs(cli)?;
    if files.is_empty() && cli.id.is_none() {
        return Err(IndexerError::Index(
            "nothing to do: no input files and no --id lookup".to_string(),
        ));
    }

    let index = SqliteIndex::new(&cli.db)?;

    if !files.is_empty() {
        index_files(&index, &files, forced, cli.tab_size, cli.dump)?;
    }

    if let Some(pattern) = &cli.id {
        lookup(&index, pattern, cli)?;
    }
    Ok(())
}

/// Expands directories (gitignore-aware) and the `-F` list into the
/// flat file set to analyze.
fn collect_inputs(cli: &Cli) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in &cli.inputs {
        if input.is_dir() {
            let walker = WalkBuilder::new(input)
                .hidden(true)
                .git_ignore(true)
                .git_global(true)
                .git_exclude(true)
                .build();
            for entry in walker.flatten() {
                let path = entry.path();
                if path.is_file() && lang::is_supported(path) {
                    files.push(path.to_path_buf());
                }
            }
        } else {
            files.push(input.clone());
        }
    }

    if let Some(list_path) = &cli.files_from {
        let reader: Box<dyn BufRead> = if list_path.as_os_str() == "-" {
            Box::new(std::io::BufReader::new(std::io::stdin()))
        } else {
            Box::new(std::io::BufReader::new(std::fs::File::open(list_path)?))
        };
        for line in reader.lines() {
            let line = line?;
            let name = line.trim().replace('\\', "/");
            if name.is_empty() || name.starts_with('#') {
                continue;
            }
            files.push(PathBuf::from(name));
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Indexing mode: digest first, skip unchanged files, analyze the
/// rest in parallel (one file per unit of work), insert serially.
fn index_files(
    index: &SqliteIndex,
    files: &[PathBuf],
    forced: LangMask,
    tab_size: u32,
    dump: bool,
) -> Result<()> {
    // Read and hash in parallel; unreadable files are logged, not
    // fatal to the run.
    let loaded: Vec<(PathBuf, Vec<u8>, String)> = files
        .par_iter()
        .filter_map(|path| match std::fs::read(path) {
            Ok(data) => {
                let digest = content_digest(&data);
                Some((path.clone(), data, digest))
            }
            Err(e) => {
                error!("cannot read {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    let mut jobs: Vec<(i64, PathBuf, Vec<u8>)> = Vec::new();
    let mut skipped = 0usize;
    for (path, data, digest) in loaded {
        let path_str = path.to_string_lossy().to_string();
        match index.prepare_file(&path_str, &digest)? {
            PrepareOutcome::Unchanged => {
                info!("{path_str}: unchanged");
                skipped += 1;
            }
            PrepareOutcome::Changed { file_id } => jobs.push((file_id, path, data)),
        }
    }

    let lang_of = |path: &Path| {
        if forced == LANG_NONE {
            lang::language_from_path(path)
        } else {
            forced
        }
    };

    let results: Vec<(i64, PathBuf, Result<FileAnalysis>)> = jobs
        .into_par_iter()
        .map(|(file_id, path, data)| {
            let lang = lang_of(&path);
            let name = path.to_string_lossy();
            let analysis = analyzer::analyze_bytes(&data, lang, tab_size, &name);
            (file_id, path, analysis)
        })
        .collect();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut analyzed = 0usize;
    for (file_id, path, analysis) in results {
        let name = path.to_string_lossy();
        match analysis {
            Ok(analysis) => {
                for record in &analysis.records {
                    writeln!(out, "{}", record.format(&name))?;
                }
                index.insert_records(file_id, &analysis.records)?;
                analyzed += 1;

                if dump {
                    let list = analyzer::dump_file(&path, forced, tab_size)?;
                    output::dump_tokens(&list, &mut out)?;
                }
            }
            Err(e) => {
                // Fatal to the file, not to the run.
                error!("{}: {}", name, e);
            }
        }
    }

    // Files that vanished from disk leave the index.
    let present: HashSet<String> = index
        .paths()?
        .into_iter()
        .filter(|p| Path::new(p).exists())
        .collect();
    let pruned = index.prune_missing(&present)?;

    info!(
        "indexed {} files ({} unchanged, {} pruned)",
        analyzed, skipped, pruned
    );
    Ok(())
}

fn lookup(index: &SqliteIndex, pattern: &str, cli: &Cli) -> Result<()> {
    let mut subs = Vec::new();
    if !(cli.defs || cli.decls || cli.refs) {
        subs.extend([
            IdSubKind::Declaration,
            IdSubKind::Definition,
            IdSubKind::Reference,
        ]);
    } else {
        if cli.decls {
            subs.push(IdSubKind::Declaration);
        }
        if cli.defs {
            subs.push(IdSubKind::Definition);
        }
        if cli.refs {
            subs.push(IdSubKind::Reference);
        }
    }

    let rows = index.lookup(pattern, &subs)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli.format {
        OutputFormat::Text => {
            for row in &rows {
                writeln!(out, "{}", row.format())?;
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&rows)
                .map_err(|e| IndexerError::Index(e.to_string()))?;
            writeln!(out, "{json}")?;
        }
    }
    Ok(())
}
