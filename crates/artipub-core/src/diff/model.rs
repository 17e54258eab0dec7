//! Change set types.
//!
//! Record contents serialize as standard base64 so change sets can be dumped
//! as JSON for review tooling.

use crate::model::ArtifactName;
use serde::{Deserialize, Serialize};

/// Kind of change for a single artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    /// Present only in the new set
    Added,
    /// Present only in the old set
    Removed,
    /// Present in both with different bytes
    Modified,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
            ChangeKind::Modified => "modified",
        }
    }
}

/// Diff record for one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub name: ArtifactName,
    pub kind: ChangeKind,
    /// Content in the old set (absent for `Added`)
    #[serde(with = "base64_bytes", default, skip_serializing_if = "Option::is_none")]
    pub old_content: Option<Vec<u8>>,
    /// Content in the new set (absent for `Removed`)
    #[serde(with = "base64_bytes", default, skip_serializing_if = "Option::is_none")]
    pub new_content: Option<Vec<u8>>,
}

impl ChangeRecord {
    pub fn added(name: ArtifactName, content: Vec<u8>) -> Self {
        Self {
            name,
            kind: ChangeKind::Added,
            old_content: None,
            new_content: Some(content),
        }
    }

    pub fn removed(name: ArtifactName, content: Vec<u8>) -> Self {
        Self {
            name,
            kind: ChangeKind::Removed,
            old_content: Some(content),
            new_content: None,
        }
    }

    pub fn modified(name: ArtifactName, old: Vec<u8>, new: Vec<u8>) -> Self {
        Self {
            name,
            kind: ChangeKind::Modified,
            old_content: Some(old),
            new_content: Some(new),
        }
    }

    pub fn old_len(&self) -> Option<usize> {
        self.old_content.as_ref().map(Vec::len)
    }

    pub fn new_len(&self) -> Option<usize> {
        self.new_content.as_ref().map(Vec::len)
    }

    /// Byte-level extent of a modification.
    ///
    /// `None` unless both old and new content are present.
    pub fn byte_span(&self) -> Option<ByteSpan> {
        let (old, new) = (self.old_content.as_deref()?, self.new_content.as_deref()?);
        Some(ByteSpan::between(old, new))
    }
}

/// The region of a modified artifact that actually changed.
///
/// Bytes `[common_prefix, old_len - common_suffix)` of the old content were
/// replaced by bytes `[common_prefix, new_len - common_suffix)` of the new.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteSpan {
    pub old_len: usize,
    pub new_len: usize,
    pub common_prefix: usize,
    pub common_suffix: usize,
}

impl ByteSpan {
    pub fn between(old: &[u8], new: &[u8]) -> Self {
        let common_prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
        let max_suffix = old.len().min(new.len()) - common_prefix;
        let common_suffix = old
            .iter()
            .rev()
            .zip(new.iter().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();
        Self {
            old_len: old.len(),
            new_len: new.len(),
            common_prefix,
            common_suffix,
        }
    }

    /// Number of old bytes replaced
    pub fn removed_len(&self) -> usize {
        self.old_len - self.common_prefix - self.common_suffix
    }

    /// Number of new bytes inserted in their place
    pub fn inserted_len(&self) -> usize {
        self.new_len - self.common_prefix - self.common_suffix
    }
}

/// Ordered set of per-artifact change records.
///
/// Records are sorted by artifact name with at most one record per name.
/// An empty change set means there is nothing to publish.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    records: Vec<ChangeRecord>,
}

impl ChangeSet {
    /// Wrap records already sorted by name
    pub(crate) fn from_sorted(records: Vec<ChangeRecord>) -> Self {
        debug_assert!(records.windows(2).all(|w| w[0].name < w[1].name));
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChangeRecord> {
        self.records.iter()
    }

    pub fn get(&self, name: &str) -> Option<&ChangeRecord> {
        self.records
            .binary_search_by(|r| r.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.records[idx])
    }

    pub fn counts(&self) -> ChangeCounts {
        let mut counts = ChangeCounts::default();
        for record in &self.records {
            match record.kind {
                ChangeKind::Added => counts.added += 1,
                ChangeKind::Removed => counts.removed += 1,
                ChangeKind::Modified => counts.modified += 1,
            }
        }
        counts
    }

    pub fn into_records(self) -> Vec<ChangeRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a ChangeRecord;
    type IntoIter = std::slice::Iter<'a, ChangeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Per-kind record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCounts {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl ChangeCounts {
    pub fn total(&self) -> usize {
        self.added + self.removed + self.modified
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
