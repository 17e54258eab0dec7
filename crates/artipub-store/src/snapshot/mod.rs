//! Snapshot persistence layer.
//!
//! Handles the ledger side of the store: staging artifact bytes in the CAS,
//! recording revisions in SQLite, reading snapshots back, and exporting
//! published revisions as plain file trees.
//!
//! ## Responsibilities
//!
//! - Commit protocol: blobs first, then one ledger transaction
//! - Optimistic concurrency via the expected head revision
//! - Digest-verified snapshot reads
//! - File-tree export and the `current` pointer
//!
//! ## Non-Responsibilities
//!
//! - Change detection (handled by `artipub-core`)
//! - Orchestration and retries (handled by `artipub-engine`)

pub mod export;
pub mod persist;
pub mod query;

pub use export::{publish_export, read_pointer, CurrentPointer};
pub use persist::commit_revision;
pub use query::{head_revision, list_revisions, load_snapshot, ArtifactRow, RevisionRow};
