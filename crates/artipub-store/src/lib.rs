//! artipub Store - durable snapshot storage with SQLite, CAS, and file-tree export
//!
//! Provides:
//! - SQLite ledger of published revisions with a migrations framework
//! - Content-addressable storage (CAS) for artifact bytes
//! - Export of each published revision as a plain file tree plus a
//!   `current` pointer
//! - `SqliteSnapshotStore`, the durable `SnapshotStore` implementation

#![allow(clippy::result_large_err)]

pub mod cas;
pub mod db;
pub mod errors;
pub mod hooks;
pub mod lock;
pub mod migrations;
pub mod snapshot;
pub mod sqlite_store;

// Re-export key types
pub use errors::Result;
pub use hooks::{CommitHook, CommitStage, FailAtStage, NoopCommitHook};
pub use sqlite_store::{SqliteSnapshotStore, StoreOptions};
