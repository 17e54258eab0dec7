//! Commit stage hooks.
//!
//! A [`CommitHook`] is notified as a commit passes each stage. Returning an
//! error before [`CommitStage::LedgerCommitted`] aborts the commit and rolls
//! the ledger back, which is how tests simulate a crash mid-commit.

use artipub_core::errors::{ExError, ExErrorKind};

use crate::errors::Result;

/// Stages of `SqliteSnapshotStore::commit`, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitStage {
    /// Every blob is durable in the CAS; the ledger is untouched
    BlobsWritten,
    /// Ledger rows are inserted inside the open transaction
    LedgerStaged,
    /// The ledger transaction committed; the revision is current
    LedgerCommitted,
    /// The file tree is exported and the `current` pointer swapped
    Exported,
}

impl CommitStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitStage::BlobsWritten => "blobs_written",
            CommitStage::LedgerStaged => "ledger_staged",
            CommitStage::LedgerCommitted => "ledger_committed",
            CommitStage::Exported => "exported",
        }
    }

    /// Whether an error at this stage still aborts the commit
    pub fn is_abortable(&self) -> bool {
        matches!(self, CommitStage::BlobsWritten | CommitStage::LedgerStaged)
    }
}

/// Observer of commit progress.
pub trait CommitHook: Send + Sync {
    /// Called once per stage with the revision being committed.
    ///
    /// # Errors
    ///
    /// Errors at abortable stages abort the commit; later errors are logged
    /// and ignored.
    fn on_stage(&self, stage: CommitStage, revision: u64) -> Result<()>;
}

/// Does nothing (the default).
pub struct NoopCommitHook;

impl CommitHook for NoopCommitHook {
    fn on_stage(&self, _: CommitStage, _: u64) -> Result<()> {
        Ok(())
    }
}

/// Fails at one stage (for tests that interrupt commits).
pub struct FailAtStage(pub CommitStage);

impl CommitHook for FailAtStage {
    fn on_stage(&self, stage: CommitStage, revision: u64) -> Result<()> {
        if stage == self.0 {
            return Err(ExError::new(ExErrorKind::Internal)
                .with_op("commit_hook")
                .with_revision(revision)
                .with_message(format!("simulated failure at {}", stage.as_str())));
        }
        Ok(())
    }
}
