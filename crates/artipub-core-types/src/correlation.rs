//! Correlation identifiers for publish runs
//!
//! A `RunId` is minted for every publish cycle and stamped on logs, errors
//! and the ledger row of any revision the run commits.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a single publish cycle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh identifier (UUIDv7, so ids roughly sort by creation time)
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an existing identifier
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_generation() {
        let id1 = RunId::new();
        let id2 = RunId::new();

        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_display_matches_as_str() {
        let id = RunId::from_string("nightly-42");
        assert_eq!(id.to_string(), "nightly-42");
    }

    #[test]
    fn test_serialization_is_transparent() {
        let id = RunId::from_string("run-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"run-1\"");
        let back: RunId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
