//! Snapshot commit operations.
//!
//! Writes artifact bytes to CAS and records a new revision in the ledger in a
//! single `BEGIN IMMEDIATE` transaction.

use crate::cas::FsStore;
use crate::errors::{from_rusqlite, Result};
use crate::hooks::{CommitHook, CommitStage};
use crate::snapshot::query::head_revision;
use artipub_core::errors::{ExError, ExErrorKind};
use artipub_core::model::{ArtifactName, ArtifactSet, Snapshot};
use artipub_core_types::RunId;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};

/// An artifact whose bytes are durable in the CAS.
#[derive(Debug, Clone)]
struct StagedArtifact {
    name: ArtifactName,
    blob_digest: String,
    size_bytes: u64,
}

/// Write every artifact's bytes to CAS.
///
/// Idempotent and harmless on its own: unreferenced blobs are never read.
fn write_blobs(cas: &FsStore, artifacts: &ArtifactSet) -> Result<Vec<StagedArtifact>> {
    artifacts
        .iter()
        .map(|(name, content)| {
            let blob_digest = cas.write(content).map_err(|e| {
                ExError::new(e.kind())
                    .with_op("write_blobs")
                    .with_entity_id(name.as_str())
                    .with_source(e)
            })?;
            Ok(StagedArtifact {
                name: name.clone(),
                blob_digest,
                size_bytes: content.len() as u64,
            })
        })
        .collect()
}

/// Current time truncated to the ledger's millisecond precision
fn ledger_now() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_millis_opt(now.timestamp_millis())
        .single()
        .unwrap_or(now)
}

fn insert_revision_row(
    tx: &Transaction,
    snapshot: &Snapshot,
    run_id: Option<&RunId>,
) -> Result<()> {
    tx.execute(
        r#"
        INSERT INTO revisions (
            revision,
            parent_revision,
            set_digest,
            artifact_count,
            total_bytes,
            created_at,
            run_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        rusqlite::params![
            snapshot.revision() as i64,
            snapshot.parent_revision().map(|r| r as i64),
            snapshot.set_digest(),
            snapshot.artifacts().len() as i64,
            snapshot.artifacts().total_bytes() as i64,
            snapshot.created_at().timestamp_millis(),
            run_id.map(|r| r.as_str()),
        ],
    )
    .map_err(|e| {
        let duplicate = matches!(
            &e,
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == ErrorCode::ConstraintViolation
        );
        // The write lock makes a duplicate unreachable unless another writer
        // bypassed it; report it as the conflict it is.
        if duplicate {
            ExError::new(ExErrorKind::ConcurrentModification)
                .with_op("commit_revision")
                .with_revision(snapshot.revision())
                .with_message(format!("revision already exists: {}", e))
        } else {
            from_rusqlite("commit_revision", e)
        }
    })?;
    Ok(())
}

fn insert_artifact_rows(tx: &Transaction, revision: u64, staged: &[StagedArtifact]) -> Result<()> {
    let mut stmt = tx
        .prepare(
            "INSERT INTO revision_artifacts (revision, name, blob_digest, size_bytes)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .map_err(|e| from_rusqlite("commit_revision", e))?;
    for artifact in staged {
        stmt.execute(rusqlite::params![
            revision as i64,
            artifact.name.as_str(),
            artifact.blob_digest,
            artifact.size_bytes as i64,
        ])
        .map_err(|e| from_rusqlite("commit_revision", e))?;
    }
    Ok(())
}

/// Commit `artifacts` as revision `expected_revision + 1`.
///
/// Protocol:
/// 1. Write every blob to CAS (durable; harmless if a crash follows)
/// 2. `BEGIN IMMEDIATE`, compare the head with `expected_revision`, insert
///    the revision row and its artifact rows
/// 3. `COMMIT`, the single atomic commit point
///
/// The hook is called after steps 1 and 2; an error from it aborts and the
/// dropped transaction rolls back.
///
/// ## Errors
///
/// - `ConcurrentModification`: the head is not `expected_revision`
/// - `StoreUnavailable`: the write lock was not acquired within the busy timeout
/// - `Persistence` / `Io`: ledger or CAS failure
pub fn commit_revision(
    conn: &mut Connection,
    cas: &FsStore,
    expected_revision: u64,
    artifacts: ArtifactSet,
    run_id: Option<&RunId>,
    hook: &dyn CommitHook,
) -> Result<Snapshot> {
    let revision = expected_revision.checked_add(1).ok_or_else(|| {
        ExError::new(ExErrorKind::InvalidInput)
            .with_op("commit_revision")
            .with_revision(expected_revision)
            .with_message("revision counter exhausted")
    })?;

    let staged = write_blobs(cas, &artifacts)?;
    hook.on_stage(CommitStage::BlobsWritten, revision)?;

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| from_rusqlite("commit_revision", e))?;

    let head = head_revision(&tx)?;
    if head != expected_revision {
        return Err(ExError::new(ExErrorKind::ConcurrentModification)
            .with_op("commit_revision")
            .with_revision(head)
            .with_message(format!(
                "expected head revision {}, found {}",
                expected_revision, head
            )));
    }

    let snapshot = Snapshot::new(revision, Some(head), ledger_now(), artifacts);
    insert_revision_row(&tx, &snapshot, run_id)?;
    insert_artifact_rows(&tx, revision, &staged)?;
    hook.on_stage(CommitStage::LedgerStaged, revision)?;

    tx.commit()
        .map_err(|e| from_rusqlite("commit_revision", e))?;

    tracing::debug!(
        revision = revision,
        artifact_count = snapshot.artifacts().len(),
        set_digest = %snapshot.set_digest(),
        "Committed revision to ledger"
    );

    Ok(snapshot)
}
