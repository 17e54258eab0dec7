pub mod artifact;
pub mod snapshot;

pub use artifact::{content_digest, ArtifactName, ArtifactSet};
pub use snapshot::{ArtifactEntry, Snapshot, SnapshotSummary};
