//! Artifact names and artifact sets.
//!
//! An [`ArtifactSet`] is the unit the generator produces and the store
//! publishes: a sorted mapping from validated relative names to opaque bytes.

use crate::errors::ArtifactError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// A validated artifact name.
///
/// Names are relative paths with `/` separators so that a set can be laid out
/// as a file tree without escaping its root. Ordering is byte-lexicographic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactName(String);

impl ArtifactName {
    /// Validate and wrap a name.
    ///
    /// # Errors
    ///
    /// Returns an [`ArtifactError`] if the name is empty, absolute, contains an
    /// empty, `.` or `..` segment, or contains a backslash or NUL byte.
    pub fn new(name: impl Into<String>) -> Result<Self, ArtifactError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ArtifactError::EmptyName);
        }
        if name.starts_with('/') {
            return Err(ArtifactError::AbsoluteName { name });
        }
        if let Some(ch) = name.chars().find(|c| matches!(c, '\\' | '\0')) {
            return Err(ArtifactError::ForbiddenCharacter { name, ch });
        }
        if let Some(segment) = name
            .split('/')
            .find(|s| s.is_empty() || *s == "." || *s == "..")
        {
            let segment = segment.to_string();
            return Err(ArtifactError::InvalidSegment { name, segment });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments, in order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl TryFrom<String> for ArtifactName {
    type Error = ArtifactError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ArtifactName> for String {
    fn from(name: ArtifactName) -> Self {
        name.0
    }
}

impl std::fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for ArtifactName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Hex SHA-256 of a blob.
pub fn content_digest(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Mapping from artifact name to content, kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactSet {
    entries: BTreeMap<ArtifactName, Vec<u8>>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from `(name, content)` pairs.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid or duplicate name.
    pub fn from_pairs<I, N, C>(pairs: I) -> Result<Self, ArtifactError>
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: Into<Vec<u8>>,
    {
        let mut set = Self::new();
        for (name, content) in pairs {
            set.insert(name, content)?;
        }
        Ok(set)
    }

    /// Add an artifact.
    ///
    /// # Errors
    ///
    /// `Duplicate` if the name is already present; name validation errors
    /// otherwise. The set is unchanged on error.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Result<(), ArtifactError> {
        let name = ArtifactName::new(name)?;
        self.insert_named(name, content.into())
    }

    /// Add an artifact under an already validated name.
    ///
    /// # Errors
    ///
    /// `Duplicate` if the name is already present.
    pub fn insert_named(
        &mut self,
        name: ArtifactName,
        content: Vec<u8>,
    ) -> Result<(), ArtifactError> {
        match self.entries.entry(name) {
            btree_map::Entry::Occupied(slot) => Err(ArtifactError::Duplicate {
                name: slot.key().to_string(),
            }),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(content);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &ArtifactName> {
        self.entries.keys()
    }

    /// Entries in sorted name order
    pub fn iter(&self) -> impl Iterator<Item = (&ArtifactName, &[u8])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Sum of all content lengths
    pub fn total_bytes(&self) -> u64 {
        self.entries.values().map(|v| v.len() as u64).sum()
    }

    /// Deterministic digest of the whole set.
    ///
    /// SHA-256 over `name \0 sha256(content) \n` for every entry in name
    /// order. Two sets have the same digest iff they hold the same names with
    /// byte-identical contents.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, content) in &self.entries {
            hasher.update(name.as_str().as_bytes());
            hasher.update([0u8]);
            hasher.update(content_digest(content).as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }

    /// First name that is also used as a directory by another name.
    ///
    /// `a` and `a/b.json` can coexist in a set but not in a file tree.
    /// Returns `(file, nested)` for the first such pair in name order.
    pub fn path_conflict(&self) -> Option<(&ArtifactName, &ArtifactName)> {
        self.entries.keys().find_map(|nested| {
            let path = nested.as_str();
            path.match_indices('/').find_map(|(idx, _)| {
                self.entries
                    .get_key_value(&path[..idx])
                    .map(|(file, _)| (file, nested))
            })
        })
    }
}

impl IntoIterator for ArtifactSet {
    type Item = (ArtifactName, Vec<u8>);
    type IntoIter = btree_map::IntoIter<ArtifactName, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_conflict_detects_file_used_as_directory() {
        let ok = ArtifactSet::from_pairs([("a.json", ""), ("a/b.json", "")]).unwrap();
        assert!(ok.path_conflict().is_none());

        let bad = ArtifactSet::from_pairs([("a", ""), ("a.json", ""), ("a/b/c", "")]).unwrap();
        let (file, nested) = bad.path_conflict().unwrap();
        assert_eq!(file.as_str(), "a");
        assert_eq!(nested.as_str(), "a/b/c");
    }

    #[test]
    fn test_valid_names() {
        for name in ["a.json", "data/mods.json", "x/y/z.txt", ".hidden"] {
            assert!(ArtifactName::new(name).is_ok(), "{} should be valid", name);
        }
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(ArtifactName::new(""), Err(ArtifactError::EmptyName));
        assert!(matches!(
            ArtifactName::new("/etc/passwd"),
            Err(ArtifactError::AbsoluteName { .. })
        ));
        assert!(matches!(
            ArtifactName::new("a/../b"),
            Err(ArtifactError::InvalidSegment { .. })
        ));
        assert!(matches!(
            ArtifactName::new("a//b"),
            Err(ArtifactError::InvalidSegment { .. })
        ));
        assert!(matches!(
            ArtifactName::new("dir/"),
            Err(ArtifactError::InvalidSegment { .. })
        ));
        assert!(matches!(
            ArtifactName::new("a\\b"),
            Err(ArtifactError::ForbiddenCharacter { ch: '\\', .. })
        ));
    }

    #[test]
    fn test_name_deserialization_validates() {
        let ok: ArtifactName = serde_json::from_str("\"a.json\"").unwrap();
        assert_eq!(ok.as_str(), "a.json");
        assert!(serde_json::from_str::<ArtifactName>("\"../x\"").is_err());
    }

    #[test]
    fn test_insert_rejects_duplicate_and_keeps_original() {
        let mut set = ArtifactSet::new();
        set.insert("a.json", "1").unwrap();
        let err = set.insert("a.json", "2").unwrap_err();
        assert_eq!(
            err,
            ArtifactError::Duplicate {
                name: "a.json".into()
            }
        );
        assert_eq!(set.get("a.json"), Some(&b"1"[..]));
    }

    #[test]
    fn test_iteration_is_sorted() {
        let set = ArtifactSet::from_pairs([("b", "2"), ("a", "1"), ("a/c", "3")]).unwrap();
        let names: Vec<&str> = set.names().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["a", "a/c", "b"]);
    }

    #[test]
    fn test_digest_ignores_insertion_order() {
        let a = ArtifactSet::from_pairs([("x", "1"), ("y", "2")]).unwrap();
        let b = ArtifactSet::from_pairs([("y", "2"), ("x", "1")]).unwrap();
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn test_digest_distinguishes_name_content_boundary() {
        let a = ArtifactSet::from_pairs([("ab", "c")]).unwrap();
        let b = ArtifactSet::from_pairs([("a", "bc")]).unwrap();
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_total_bytes() {
        let set = ArtifactSet::from_pairs([("a", "123"), ("b", "45")]).unwrap();
        assert_eq!(set.total_bytes(), 5);
    }
}
