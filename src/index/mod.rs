pub mod store;

pub use store::{IndexStats, LookupRow, PrepareOutcome, SqliteIndex};
