//! artipub Core - domain model and pure publish logic
//!
//! This crate provides the I/O-free parts of the publish pipeline:
//! - Artifact names, artifact sets and immutable snapshots
//! - The byte-exact diff engine and its human-readable summary
//! - The canonical `ExError` facility
//! - The structured logging facility
//! - The `ArtifactGenerator` and `SnapshotStore` seams, plus an in-memory store
//!
//! Durable storage lives in `artipub-store`; orchestration in `artipub-engine`.

// Macros expand to `$crate::artipub_core_types::schema::*`.
#[doc(hidden)]
pub use artipub_core_types;

pub mod diff;
pub mod errors;
pub mod generator;
pub mod logging_facility;
pub mod model;
pub mod store;

// Re-export commonly used types
pub use diff::{compute_diff, render_human_summary, ChangeKind, ChangeRecord, ChangeSet};
pub use errors::{ArtifactError, ExError, ExErrorKind, Result};
pub use generator::{ArtifactGenerator, StaticGenerator};
pub use model::{ArtifactName, ArtifactSet, Snapshot};
pub use store::{MemorySnapshotStore, SnapshotStore};
