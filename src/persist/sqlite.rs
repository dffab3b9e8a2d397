//! SQLite-backed snapshot sink.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::store::DatabaseSnapshot;

use super::{PersistError, PersistResult, SnapshotSink};

const SNAPSHOT_FORMAT_VERSION: u16 = 1;

const PRUNE_SQL: &str =
    "DELETE FROM snapshots WHERE id NOT IN (SELECT id FROM snapshots ORDER BY id DESC LIMIT ?1)";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotEnvelope {
    format_version: u16,
    snapshot: DatabaseSnapshot,
}

/// Snapshot rows kept after each write unless [`SqliteSink::with_retention`] says otherwise.
pub const DEFAULT_RETAINED_SNAPSHOTS: usize = 1;

/// SQLite implementation of [`crate::persist::SnapshotSink`].
///
/// Each flush appends one snapshot row and prunes all but the newest
/// `retain` rows in the same transaction; loading reads the newest row.
pub struct SqliteSink {
    conn: Connection,
    retain: usize,
}

impl SqliteSink {
    /// Opens or creates a SQLite-backed sink at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=FULL`, so a write is on disk
    /// once `write_snapshot` returns.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory SQLite sink.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        Ok(Self {
            conn,
            retain: DEFAULT_RETAINED_SNAPSHOTS,
        })
    }

    /// Keeps the newest `keep` snapshots after every write (at least one).
    pub fn with_retention(mut self, keep: usize) -> Self {
        self.retain = keep.max(1);
        self
    }

    /// Number of snapshots kept after each write.
    pub fn retention(&self) -> usize {
        self.retain
    }

    /// Number of snapshot rows currently stored.
    pub fn snapshot_count(&self) -> PersistResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Deletes all but the newest `keep` snapshots.
    pub fn compact(&mut self, keep: usize) -> PersistResult<usize> {
        let count = self.conn.execute(PRUNE_SQL, params![keep as i64])?;
        Ok(count)
    }
}

impl SnapshotSink for SqliteSink {
    fn load_snapshot(&self) -> PersistResult<Option<DatabaseSnapshot>> {
        let payload: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT payload FROM snapshots ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let env: SnapshotEnvelope = serde_json::from_slice(&payload)?;
        if env.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(PersistError::Message(format!(
                "unsupported snapshot format version: {}",
                env.format_version
            )));
        }
        Ok(Some(env.snapshot))
    }

    fn write_snapshot(&mut self, snapshot: &DatabaseSnapshot) -> PersistResult<()> {
        let env = SnapshotEnvelope {
            format_version: SNAPSHOT_FORMAT_VERSION,
            snapshot: snapshot.clone(),
        };
        let payload = serde_json::to_vec(&env)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO snapshots(ts_ms, payload) VALUES (?1, ?2)",
            params![now_ms() as i64, payload],
        )?;
        let pruned = tx.execute(PRUNE_SQL, params![self.retain as i64])?;
        tx.commit()?;
        if pruned > 0 {
            debug!(pruned, "old snapshots pruned");
        }
        Ok(())
    }

    fn flush(&mut self) -> PersistResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
