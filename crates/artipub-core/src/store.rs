//! The snapshot store seam and its in-memory implementation.

use std::sync::{Mutex, MutexGuard};

use artipub_core_types::RunId;
use chrono::Utc;

use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::{ArtifactSet, Snapshot};

/// Holds the current published snapshot and replaces it atomically.
///
/// Revisions increase by one per commit starting from the genesis revision
/// `0`. Implementations use optimistic concurrency: `commit` names the
/// revision the caller based its work on and fails if the head has moved.
pub trait SnapshotStore: Send + Sync {
    /// Latest committed snapshot, or genesis for an empty store.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` when the backing store cannot be reached.
    fn current(&self) -> Result<Snapshot>;

    /// Atomically make `artifacts` current as revision `expected_revision + 1`.
    ///
    /// The new snapshot is durable before this returns. On any error the
    /// previously current snapshot is left in place.
    ///
    /// # Errors
    ///
    /// `ConcurrentModification` if the head revision is no longer
    /// `expected_revision`; `StoreUnavailable` on backing-store failures.
    fn commit(&self, expected_revision: u64, artifacts: ArtifactSet) -> Result<Snapshot>;

    /// Like [`commit`](Self::commit), recording which publish run wrote it.
    ///
    /// # Errors
    ///
    /// Same as `commit`.
    fn commit_for_run(
        &self,
        expected_revision: u64,
        artifacts: ArtifactSet,
        run_id: &RunId,
    ) -> Result<Snapshot> {
        let _ = run_id;
        self.commit(expected_revision, artifacts)
    }

    /// Label used in logs
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// Mutex-guarded in-memory store.
///
/// Keeps every committed snapshot so tests can inspect history.
#[derive(Debug)]
pub struct MemorySnapshotStore {
    history: Mutex<Vec<Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(vec![Snapshot::genesis()]),
        }
    }

    /// Store whose revision 1 is `artifacts`
    pub fn with_initial(artifacts: ArtifactSet) -> Self {
        let first = Snapshot::new(1, Some(Snapshot::GENESIS_REVISION), Utc::now(), artifacts);
        Self {
            history: Mutex::new(vec![Snapshot::genesis(), first]),
        }
    }

    /// Every snapshot from genesis to the head, oldest first.
    ///
    /// # Errors
    ///
    /// `Internal` if the lock was poisoned.
    pub fn history(&self) -> Result<Vec<Snapshot>> {
        Ok(self.lock("history")?.clone())
    }

    /// Number of commits made, genesis excluded.
    ///
    /// # Errors
    ///
    /// `Internal` if the lock was poisoned.
    pub fn commit_count(&self) -> Result<usize> {
        Ok(self.lock("commit_count")?.len() - 1)
    }

    fn lock(&self, op: &str) -> Result<MutexGuard<'_, Vec<Snapshot>>> {
        self.history.lock().map_err(|_| {
            ExError::new(ExErrorKind::Internal)
                .with_op(op)
                .with_message("memory store lock poisoned")
        })
    }
}

impl Default for MemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn current(&self) -> Result<Snapshot> {
        let history = self.lock("current")?;
        history.last().cloned().ok_or_else(|| {
            ExError::new(ExErrorKind::Internal)
                .with_op("current")
                .with_message("memory store has no genesis snapshot")
        })
    }

    fn commit(&self, expected_revision: u64, artifacts: ArtifactSet) -> Result<Snapshot> {
        let mut history = self.lock("commit")?;
        let head = history
            .last()
            .map(Snapshot::revision)
            .unwrap_or(Snapshot::GENESIS_REVISION);

        if head != expected_revision {
            return Err(ExError::new(ExErrorKind::ConcurrentModification)
                .with_op("commit")
                .with_revision(head)
                .with_message(format!(
                    "expected head revision {expected_revision}, found {head}"
                )));
        }

        let snapshot = Snapshot::new(head + 1, Some(head), Utc::now(), artifacts);
        history.push(snapshot.clone());
        tracing::debug!(
            revision = snapshot.revision(),
            artifact_count = snapshot.artifacts().len(),
            "memory store committed snapshot"
        );
        Ok(snapshot)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pairs: &[(&str, &str)]) -> ArtifactSet {
        ArtifactSet::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_empty_store_reports_genesis() {
        let store = MemorySnapshotStore::new();
        let current = store.current().unwrap();
        assert!(current.is_genesis());
        assert!(current.artifacts().is_empty());
    }

    #[test]
    fn test_commit_advances_revision() {
        let store = MemorySnapshotStore::new();
        let s1 = store.commit(0, set(&[("a.json", "1")])).unwrap();
        assert_eq!(s1.revision(), 1);
        assert_eq!(s1.parent_revision(), Some(0));
        let s2 = store.commit(1, set(&[("a.json", "2")])).unwrap();
        assert_eq!(s2.revision(), 2);
        assert_eq!(store.current().unwrap(), s2);
        assert_eq!(store.commit_count().unwrap(), 2);
    }

    #[test]
    fn test_stale_commit_is_rejected_and_leaves_head() {
        let store = MemorySnapshotStore::new();
        store.commit(0, set(&[("a.json", "1")])).unwrap();

        let err = store.commit(0, set(&[("a.json", "other")])).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::ConcurrentModification);
        assert_eq!(err.revision(), Some(1));
        assert_eq!(store.current().unwrap().artifacts().get("a.json"), Some(&b"1"[..]));
    }

    #[test]
    fn test_concurrent_commits_same_base_one_wins() {
        use std::sync::Arc;
        let store = Arc::new(MemorySnapshotStore::new());
        let handles: Vec<_> = (0..2)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let content = format!("writer-{i}");
                    store.commit(0, set(&[("a.json", content.as_str())]))
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let err = results.into_iter().find_map(|r| r.err()).unwrap();
        assert_eq!(err.kind(), ExErrorKind::ConcurrentModification);
    }

    #[test]
    fn test_with_initial() {
        let store = MemorySnapshotStore::with_initial(set(&[("a.json", "1")]));
        assert_eq!(store.current().unwrap().revision(), 1);
    }
}
