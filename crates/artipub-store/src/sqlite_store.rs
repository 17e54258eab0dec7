//! Durable `SnapshotStore` backed by a SQLite ledger, a CAS and exported
//! file trees under one root directory.

use crate::cas::{sweep_stale_temps, FsStore};
use crate::db;
use crate::errors::{io_error, Result};
use crate::hooks::{CommitHook, CommitStage, NoopCommitHook};
use crate::lock::FileLock;
use crate::migrations::apply_migrations;
use crate::snapshot::export::{self, CURRENT_LINK, EXPORTS_DIR};
use crate::snapshot::{commit_revision, head_revision, list_revisions, load_snapshot};
use artipub_core::errors::{ExError, ExErrorKind};
use artipub_core::model::{ArtifactSet, Snapshot, SnapshotSummary};
use artipub_core::store::SnapshotStore;
use artipub_core_types::RunId;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const LEDGER_FILE: &str = "ledger.db";
pub const CAS_DIR: &str = "cas";
/// Serializes exports across every store sharing a root
pub const EXPORT_LOCK_FILE: &str = "export.lock";

/// Temp files younger than this may belong to a live writer
const STALE_TEMP_AGE: Duration = Duration::from_secs(600);

/// Tunables for [`SqliteSnapshotStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// How long to wait for the ledger write lock before `StoreUnavailable`
    pub busy_timeout: Duration,
    /// Export trees retained, newest first (the current one is always kept)
    pub keep_exports: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(5000),
            keep_exports: 3,
        }
    }
}

/// Snapshot store rooted at a directory.
///
/// Several stores, in one process or many, may share a root; the ledger's
/// write lock serializes their commits.
pub struct SqliteSnapshotStore {
    root: PathBuf,
    conn: Mutex<Connection>,
    cas: FsStore,
    options: StoreOptions,
    hook: Arc<dyn CommitHook>,
}

impl SqliteSnapshotStore {
    /// Open or create a store at `root`.
    ///
    /// Applies pending migrations and repairs a stale export of the head.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if the root or ledger cannot be opened;
    /// `Persistence` if migrations fail.
    pub fn open(root: impl Into<PathBuf>, options: StoreOptions) -> Result<Self> {
        let root = root.into();
        for dir in [root.clone(), root.join(CAS_DIR), root.join(EXPORTS_DIR)] {
            std::fs::create_dir_all(&dir)
                .map_err(|e| unavailable(&root, io_error("store_open", e)))?;
        }

        let mut conn = db::open(root.join(LEDGER_FILE), options.busy_timeout)?;
        apply_migrations(&mut conn)?;

        let store = Self {
            cas: FsStore::new(root.join(CAS_DIR)),
            root,
            conn: Mutex::new(conn),
            options,
            hook: Arc::new(NoopCommitHook),
        };

        let head = store.load_head()?;
        store.repair_export(&head);

        tracing::debug!(
            root = %store.root.display(),
            revision = head.revision(),
            "Opened snapshot store"
        );
        Ok(store)
    }

    /// Replace the commit hook
    pub fn with_hook(mut self, hook: Arc<dyn CommitHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Directory holding the current artifacts as plain files
    pub fn current_dir(&self) -> PathBuf {
        self.root.join(CURRENT_LINK)
    }

    pub fn head_revision(&self) -> Result<u64> {
        let conn = self.lock("head_revision")?;
        head_revision(&conn)
    }

    /// Load a past or current revision.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown revision; `MissingBlob` or `CorruptSnapshot`
    /// if its content fails verification.
    pub fn snapshot_at(&self, revision: u64) -> Result<Snapshot> {
        let conn = self.lock("snapshot_at")?;
        load_snapshot(&conn, &self.cas, revision)
    }

    /// Summaries of committed revisions, newest first.
    pub fn history(&self, limit: Option<usize>) -> Result<Vec<SnapshotSummary>> {
        let conn = self.lock("history")?;
        list_revisions(&conn, limit)?
            .iter()
            .map(|row| row.summary())
            .collect()
    }

    /// Re-materialize the current tree and pointer from the ledger.
    ///
    /// Unlike the implicit repair in `current()`, failures are returned.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if another exporter holds the export lock past the
    /// busy timeout, `Io` if the tree cannot be written.
    pub fn export_current(&self) -> Result<Snapshot> {
        let head = self.load_head()?;
        if !head.is_genesis() {
            self.export_if_head(&head)?;
        }
        Ok(head)
    }

    /// Export `snapshot` unless a newer revision has been committed since.
    ///
    /// Runs under the root's export lock, so the ledger head and the pointer
    /// are re-read with no other exporter in between. Returns whether the
    /// tree was exported.
    pub(crate) fn export_if_head(&self, snapshot: &Snapshot) -> Result<bool> {
        let lock_path = self.root.join(EXPORT_LOCK_FILE);
        let _lock = FileLock::acquire(&lock_path, self.options.busy_timeout)?;

        let head = self.head_revision()?;
        if head != snapshot.revision() {
            tracing::debug!(
                revision = snapshot.revision(),
                head,
                "Skipping export of superseded revision"
            );
            return Ok(false);
        }

        export::publish_export(&self.root, snapshot)?;
        self.housekeeping(snapshot.revision());
        Ok(true)
    }

    fn lock(&self, op: &str) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            ExError::new(ExErrorKind::Internal)
                .with_op(op)
                .with_message("ledger connection lock poisoned")
        })
    }

    fn load_head(&self) -> Result<Snapshot> {
        let conn = self.lock("current")?;
        let head = head_revision(&conn)?;
        load_snapshot(&conn, &self.cas, head)
    }

    /// Bring the exported tree up to `head` if it lags; failures are logged.
    fn repair_export(&self, head: &Snapshot) {
        if head.is_genesis() || export::is_exported(&self.root, head) {
            return;
        }
        match self.export_if_head(head) {
            Ok(true) => tracing::info!(revision = head.revision(), "Repaired current export"),
            Ok(false) => {}
            Err(e) => tracing::warn!(
                revision = head.revision(),
                error = %e,
                "Export repair failed"
            ),
        }
    }

    fn housekeeping(&self, current_revision: u64) {
        let keep = self.options.keep_exports;
        if let Err(e) = export::prune_exports(&self.root, keep, current_revision) {
            tracing::warn!(error = %e, "Export pruning failed");
        }
        for dir in [
            self.root.clone(),
            self.root.join(CAS_DIR),
            self.root.join(EXPORTS_DIR),
        ] {
            match sweep_stale_temps(&dir, STALE_TEMP_AGE) {
                Ok(0) => {}
                Ok(removed) => {
                    tracing::debug!(dir = %dir.display(), removed, "Removed stale temp files")
                }
                Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "Temp sweep failed"),
            }
        }
    }

    fn notify_after_commit(&self, stage: CommitStage, revision: u64) {
        if let Err(e) = self.hook.on_stage(stage, revision) {
            tracing::warn!(
                stage = stage.as_str(),
                revision,
                error = %e,
                "Commit hook failed after ledger commit"
            );
        }
    }

    fn commit_inner(
        &self,
        expected_revision: u64,
        artifacts: ArtifactSet,
        run_id: Option<&RunId>,
    ) -> Result<Snapshot> {
        if let Some((file, nested)) = artifacts.path_conflict() {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("commit")
                .with_entity_id(nested.as_str())
                .with_message(format!(
                    "'{}' cannot be exported: '{}' is also a file",
                    nested, file
                )));
        }

        let snapshot = {
            let mut conn = self.lock("commit")?;
            commit_revision(
                &mut conn,
                &self.cas,
                expected_revision,
                artifacts,
                run_id,
                self.hook.as_ref(),
            )?
        };
        let revision = snapshot.revision();
        self.notify_after_commit(CommitStage::LedgerCommitted, revision);

        // The ledger commit is the point of no return; export is repairable.
        match self.export_if_head(&snapshot) {
            Ok(true) => self.notify_after_commit(CommitStage::Exported, revision),
            // A newer commit owns the export
            Ok(false) => {}
            Err(e) => tracing::warn!(
                revision,
                error = %e,
                "Export after commit failed; will repair on next read"
            ),
        }

        Ok(snapshot)
    }
}

fn unavailable(root: &Path, source: ExError) -> ExError {
    ExError::new(ExErrorKind::StoreUnavailable)
        .with_op("store_open")
        .with_entity_id(root.display().to_string())
        .with_source(source)
}

impl SnapshotStore for SqliteSnapshotStore {
    fn current(&self) -> Result<Snapshot> {
        let head = self.load_head()?;
        self.repair_export(&head);
        Ok(head)
    }

    fn commit(&self, expected_revision: u64, artifacts: ArtifactSet) -> Result<Snapshot> {
        self.commit_inner(expected_revision, artifacts, None)
    }

    fn commit_for_run(
        &self,
        expected_revision: u64,
        artifacts: ArtifactSet,
        run_id: &RunId,
    ) -> Result<Snapshot> {
        self.commit_inner(expected_revision, artifacts, Some(run_id))
    }

    fn describe(&self) -> String {
        format!("sqlite({})", self.root.display())
    }
}
