//! Immutable published snapshots.

use crate::model::artifact::{content_digest, ArtifactSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An artifact set as it was published at one revision.
///
/// Snapshots are immutable: all fields are fixed at construction and the
/// set digest is computed once from the artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    revision: u64,
    parent_revision: Option<u64>,
    created_at: DateTime<Utc>,
    set_digest: String,
    artifacts: ArtifactSet,
}

impl Snapshot {
    /// Revision number reported by a store that has never been committed to.
    pub const GENESIS_REVISION: u64 = 0;

    pub fn new(
        revision: u64,
        parent_revision: Option<u64>,
        created_at: DateTime<Utc>,
        artifacts: ArtifactSet,
    ) -> Self {
        let set_digest = artifacts.digest();
        Self {
            revision,
            parent_revision,
            created_at,
            set_digest,
            artifacts,
        }
    }

    /// The empty snapshot at revision 0.
    pub fn genesis() -> Self {
        Self::new(
            Self::GENESIS_REVISION,
            None,
            DateTime::<Utc>::default(),
            ArtifactSet::new(),
        )
    }

    pub fn is_genesis(&self) -> bool {
        self.revision == Self::GENESIS_REVISION
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn parent_revision(&self) -> Option<u64> {
        self.parent_revision
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_digest(&self) -> &str {
        &self.set_digest
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    pub fn into_artifacts(self) -> ArtifactSet {
        self.artifacts
    }

    /// Metadata view suitable for listings and pointer documents
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            revision: self.revision,
            parent_revision: self.parent_revision,
            created_at: self.created_at,
            set_digest: self.set_digest.clone(),
            artifact_count: self.artifacts.len(),
            total_bytes: self.artifacts.total_bytes(),
        }
    }

    /// Per-artifact metadata, in name order
    pub fn entries(&self) -> Vec<ArtifactEntry> {
        self.artifacts
            .iter()
            .map(|(name, content)| ArtifactEntry {
                name: name.to_string(),
                size_bytes: content.len() as u64,
                digest: content_digest(content),
            })
            .collect()
    }
}

/// Snapshot metadata without content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub revision: u64,
    pub parent_revision: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub set_digest: String,
    pub artifact_count: usize,
    pub total_bytes: u64,
}

/// One artifact's name, size and content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub name: String,
    pub size_bytes: u64,
    pub digest: String,
}
