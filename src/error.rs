use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Parse error in {file}:{line}: {message}")]
    Parse {
        file: String,
        line: u32,
        message: String,
    },

    #[error("Parse frame overflow in {file}:{line}")]
    FrameOverflow { file: String, line: u32 },

    #[error("Unknown language tag: {0}")]
    UnknownLanguage(String),

    #[error("Index format version {found}, expected {expected}; delete the index to continue")]
    IndexVersion { found: i64, expected: i64 },

    #[error("Index error: {0}")]
    Index(String),
}

pub type Result<T> = std::result::Result<T, IndexerError>;
