//! In-memory document collections and the durable store that owns them.

/// Generic ordered collection with a monotonic id counter.
pub mod collection;
/// Database, snapshot layout and the flushing document store.
pub mod store;
