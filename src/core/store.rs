use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    persist::{PersistError, SnapshotSink},
    record::{Problem, Submission, User},
};

use super::collection::{Collection, Document, Keyed};

/// Failure of a store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record matched the predicate.
    #[error("no matching record in {collection}")]
    NotFound {
        /// Collection that was searched.
        collection: &'static str,
    },
    /// The durable write failed. The in-memory change is kept.
    #[error("persist: {0}")]
    Persist(#[from] PersistError),
}

/// Problems plus the highest problem id ever issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountedRecords<T> {
    /// Highest id ever issued.
    pub counter: u64,
    /// Live records in insertion order.
    pub data: Vec<T>,
}

impl<T> Default for CountedRecords<T> {
    fn default() -> Self {
        Self {
            counter: 0,
            data: Vec::new(),
        }
    }
}

/// On-disk layout of the whole database. Submissions carry no stored counter;
/// theirs is recovered from the highest id on load.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    /// Seeded accounts.
    #[serde(default)]
    pub users: Vec<User>,
    /// Problems with their id counter.
    #[serde(default)]
    pub problems: CountedRecords<Problem>,
    /// Submissions in creation order.
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

/// The three in-memory collections.
#[derive(Debug, Clone, Default)]
pub struct Database {
    pub(crate) users: Collection<User>,
    pub(crate) problems: Collection<Problem>,
    pub(crate) submissions: Collection<Submission>,
}

impl Database {
    /// Rebuilds collections, raising each counter to at least its highest stored id.
    pub fn from_snapshot(snapshot: DatabaseSnapshot) -> Self {
        let users = Collection::from_parts(snapshot.users, 0);
        let problems = Collection::from_records(snapshot.problems.data, snapshot.problems.counter);
        let submissions = Collection::from_records(snapshot.submissions, 0);
        Self {
            users,
            problems,
            submissions,
        }
    }

    /// Copies the collections into the file layout.
    pub fn export_snapshot(&self) -> DatabaseSnapshot {
        DatabaseSnapshot {
            users: self.users.records().to_vec(),
            problems: CountedRecords {
                counter: self.problems.counter(),
                data: self.problems.records().to_vec(),
            },
            submissions: self.submissions.records().to_vec(),
        }
    }
}

/// Authoritative in-memory database mirrored to an optional durable sink.
///
/// Every mutating call writes the full snapshot to the sink before it
/// returns. Mutations take `&mut self`, so callers sharing a store across
/// tasks must serialize access (see [`crate::runtime::handle`]).
pub struct DocumentStore {
    db: Database,
    sink: Option<Box<dyn SnapshotSink>>,
    generation: u64,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("db", &self.db)
            .field("durable", &self.sink.is_some())
            .field("generation", &self.generation)
            .finish()
    }
}

impl DocumentStore {
    /// Store with no durable backing, starting from `seed`.
    pub fn in_memory(seed: DatabaseSnapshot) -> Self {
        Self {
            db: Database::from_snapshot(seed),
            sink: None,
            generation: 0,
        }
    }

    /// Loads the latest snapshot from `sink`, or starts from `seed` when the
    /// sink holds nothing yet. The seed is not written until the first
    /// mutation.
    pub fn open(sink: Box<dyn SnapshotSink>, seed: DatabaseSnapshot) -> Result<Self, StoreError> {
        let snapshot = match sink.load_snapshot()? {
            Some(snapshot) => snapshot,
            None => {
                info!("no durable snapshot found, starting from seed");
                seed
            }
        };
        let db = Database::from_snapshot(snapshot);
        info!(
            users = db.users.len(),
            problems = db.problems.len(),
            submissions = db.submissions.len(),
            "document store opened"
        );
        Ok(Self {
            db,
            sink: Some(sink),
            generation: 0,
        })
    }

    /// Read access to the collections.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Current state in the file layout.
    pub fn export_snapshot(&self) -> DatabaseSnapshot {
        self.db.export_snapshot()
    }

    /// Number of successful durable writes since the store was opened.
    pub fn durable_generation(&self) -> u64 {
        self.generation
    }

    /// True when a sink is attached.
    pub fn is_durable(&self) -> bool {
        self.sink.is_some()
    }

    /// Issues the next id for `T` without inserting anything.
    pub fn allocate<T: Keyed>(&mut self) -> u64 {
        T::collection_mut(&mut self.db).allocate()
    }

    /// Assigns a fresh id, appends the record and flushes.
    pub fn insert<T: Keyed>(&mut self, mut record: T) -> Result<u64, StoreError> {
        let id = self.allocate::<T>();
        record.set_id(id);
        T::collection_mut(&mut self.db).push(record);
        debug!(collection = T::COLLECTION, id, "inserted");
        self.flush()?;
        Ok(id)
    }

    /// All records of `T` in insertion order.
    pub fn list<T: Document>(&self) -> &[T] {
        T::collection(&self.db).records()
    }

    /// First record of `T` matching `pred`.
    pub fn find<T: Document>(&self, pred: impl Fn(&T) -> bool) -> Result<&T, StoreError> {
        T::collection(&self.db)
            .find(pred)
            .ok_or(StoreError::NotFound {
                collection: T::COLLECTION,
            })
    }

    /// Applies `f` to the first match in place and flushes.
    pub fn mutate<T: Document, R>(
        &mut self,
        pred: impl Fn(&T) -> bool,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, StoreError> {
        let rec = T::collection_mut(&mut self.db)
            .find_mut(pred)
            .ok_or(StoreError::NotFound {
                collection: T::COLLECTION,
            })?;
        let out = f(rec);
        debug!(collection = T::COLLECTION, "mutated");
        self.flush()?;
        Ok(out)
    }

    /// Deletes the first match. Flushes only when something was removed.
    pub fn remove<T: Document>(&mut self, pred: impl Fn(&T) -> bool) -> Result<bool, StoreError> {
        if T::collection_mut(&mut self.db).remove_first(pred).is_none() {
            return Ok(false);
        }
        debug!(collection = T::COLLECTION, "removed");
        self.flush()?;
        Ok(true)
    }

    /// Writes the entire database to the sink. A failed write leaves the
    /// in-memory state as is.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        let snapshot = self.db.export_snapshot();
        let res = sink.write_snapshot(&snapshot).and_then(|_| sink.flush());
        if let Err(err) = res {
            warn!(error = %err, "snapshot flush failed");
            return Err(err.into());
        }
        self.generation += 1;
        debug!(generation = self.generation, "snapshot flushed");
        Ok(())
    }
}
