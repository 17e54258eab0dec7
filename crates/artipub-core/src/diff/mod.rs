//! Artifact set diff engine.
//!
//! Compares a freshly generated artifact set against the published one and
//! produces a [`ChangeSet`].
//!
//! ## Entry point
//!
//! ```
//! use artipub_core::diff::compute_diff;
//! use artipub_core::model::ArtifactSet;
//!
//! let old = ArtifactSet::from_pairs([("a.json", "1")]).unwrap();
//! let new = ArtifactSet::from_pairs([("a.json", "2")]).unwrap();
//! let changes = compute_diff(&old, &new);
//! assert_eq!(changes.len(), 1);
//! ```
//!
//! ## Guarantees
//!
//! - **Purity**: no side effects, no clock, no I/O.
//! - **Byte exactness**: contents are compared byte for byte; no whitespace or
//!   semantic normalization, so byte-identical regenerations never register.
//! - **Determinism**: records are sorted by artifact name; identical inputs
//!   produce identical change sets.

pub mod engine;
pub mod human_summary;
pub mod model;

pub use engine::compute_diff;
pub use human_summary::render_human_summary;
pub use model::{ByteSpan, ChangeCounts, ChangeKind, ChangeRecord, ChangeSet};
