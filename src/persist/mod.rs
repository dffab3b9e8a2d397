//! Snapshot sinks and their error type.

/// Single-file JSON sink.
pub mod json;
/// SQLite sink.
pub mod sqlite;

use thiserror::Error;

use crate::core::store::DatabaseSnapshot;

/// Failure while loading or writing a snapshot, or a rejected setting.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// SQLite error.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Snapshot or config could not be (de)serialized.
    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
    /// Anything else, such as an unknown format version or a bad config value.
    #[error("{0}")]
    Message(String),
}

/// Result alias for sink operations.
pub type PersistResult<T> = Result<T, PersistError>;

/// Durable home for full database snapshots.
pub trait SnapshotSink: Send {
    /// Returns the newest stored snapshot, or `None` if nothing was written yet.
    fn load_snapshot(&self) -> PersistResult<Option<DatabaseSnapshot>>;
    /// Stores `snapshot` as the newest state.
    fn write_snapshot(&mut self, snapshot: &DatabaseSnapshot) -> PersistResult<()>;
    /// Pushes buffered writes to stable storage. Default is a no-op.
    fn flush(&mut self) -> PersistResult<()> {
        Ok(())
    }
}
