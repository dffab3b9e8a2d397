//! Store and runtime configuration.

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    auth::session::{DEFAULT_SESSION_TTL_SECS, SessionRegistry},
    core::store::{DatabaseSnapshot, DocumentStore, StoreError},
    persist::{
        PersistError, PersistResult,
        json::JsonFileSink,
        sqlite::{DEFAULT_RETAINED_SNAPSHOTS, SqliteSink},
    },
    service::JudgeService,
};

/// Where snapshots are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One JSON document at `db_path`.
    Json,
    /// SQLite database at `db_path`.
    Sqlite,
    /// Nothing is written.
    Memory,
}

/// Deployment settings. Every key is optional in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// Database file for the `json` and `sqlite` backends.
    pub db_path: PathBuf,
    /// Snapshot backend.
    pub backend: Backend,
    /// Session lifetime in seconds. Must be positive.
    pub session_ttl_secs: i64,
    /// Snapshot rows the SQLite backend keeps after each write.
    pub snapshot_retention: usize,
    /// Capacity of the runtime command queue.
    pub command_queue_bound: usize,
    /// Capacity of the runtime event broadcast.
    pub event_capacity: usize,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("db.json"),
            backend: Backend::Json,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            snapshot_retention: DEFAULT_RETAINED_SNAPSHOTS,
            command_queue_bound: 256,
            event_capacity: 1024,
        }
    }
}

impl JudgeConfig {
    /// Reads a JSON config file; missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> PersistResult<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Session lifetime, rejecting values that are not positive or that
    /// cannot be added to the current time.
    pub fn session_ttl(&self) -> PersistResult<Duration> {
        let secs = self.session_ttl_secs;
        if secs <= 0 {
            return Err(PersistError::Message(format!(
                "session_ttl_secs must be positive, got {secs}"
            )));
        }
        Duration::try_seconds(secs)
            .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or_else(|| PersistError::Message(format!("session_ttl_secs out of range: {secs}")))
    }

    /// Opens the configured backend, falling back to `seed` when it is empty.
    pub fn open_store(&self, seed: DatabaseSnapshot) -> Result<DocumentStore, StoreError> {
        match self.backend {
            Backend::Json => DocumentStore::open(Box::new(JsonFileSink::new(&self.db_path)), seed),
            Backend::Sqlite => {
                let sink = SqliteSink::open(&self.db_path)?.with_retention(self.snapshot_retention);
                DocumentStore::open(Box::new(sink), seed)
            }
            Backend::Memory => Ok(DocumentStore::in_memory(seed)),
        }
    }

    /// Validates the settings, opens the store and wraps it in a service.
    pub fn build_service(&self, seed: DatabaseSnapshot) -> Result<JudgeService, StoreError> {
        let ttl = self.session_ttl()?;
        let store = self.open_store(seed)?;
        Ok(JudgeService::new(store, SessionRegistry::new(ttl)))
    }
}
