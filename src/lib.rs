//! Online-judge mock backend: password sessions, role gating and a
//! document store that writes the whole database on every mutation.
//!
//! # Examples
//!
//! In-memory usage with [`service::JudgeService`]:
//! ```
//! use ojmock::{
//!     auth::{credential, session::SessionRegistry},
//!     core::store::{DatabaseSnapshot, DocumentStore},
//!     service::JudgeService,
//!     types::Role,
//! };
//!
//! let seed = DatabaseSnapshot {
//!     users: vec![credential::provision("alice", "Alice", Role::Teacher, "pw123")],
//!     ..DatabaseSnapshot::default()
//! };
//! let mut svc = JudgeService::new(DocumentStore::in_memory(seed), SessionRegistry::default());
//! let session = svc.login("alice", "pw123").expect("login");
//! let id = svc.create_problem(&session.token, "Two Sum", "desc").expect("create");
//! assert_eq!(id, 1);
//! ```
//!
//! Runtime usage with a JSON file:
//! ```no_run
//! use ojmock::{
//!     config::JudgeConfig,
//!     core::store::DatabaseSnapshot,
//!     runtime::handle::spawn_judge,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cfg = JudgeConfig::default();
//! let service = cfg.build_service(DatabaseSnapshot::default()).expect("open store");
//! let handle = spawn_judge(service, &cfg);
//! let session = handle.login("alice", "pw123").await.expect("login");
//! let _problems = handle.list_problems(session.token).await.expect("list");
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// Credentials, sessions and the authorization gate.
pub mod auth;
/// Problem catalog over the document store.
pub mod catalog;
/// Store and runtime configuration.
pub mod config;
/// Generic collections and the flushing document store.
pub mod core;
/// User directory over the document store.
pub mod directory;
/// Operation error taxonomy.
pub mod error;
/// Synthetic grading sources.
pub mod grading;
/// Append-only submission ledger.
pub mod ledger;
/// Snapshot sinks: JSON file and SQLite.
pub mod persist;
/// Stored records, drafts and patches.
pub mod record;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Gated judge operations.
pub mod service;
/// Shared primitive types and enums.
pub mod types;
