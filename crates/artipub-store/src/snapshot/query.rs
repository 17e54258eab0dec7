//! Read-only ledger queries.
//!
//! Revision rows are immutable once committed, so reading a head revision
//! and then its artifact rows needs no enclosing transaction.

use crate::cas::FsStore;
use crate::errors::{from_rusqlite, Result};
use artipub_core::errors::{ExError, ExErrorKind};
use artipub_core::model::{ArtifactName, ArtifactSet, Snapshot, SnapshotSummary};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

/// A raw row from the `revisions` ledger table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionRow {
    pub revision: u64,
    pub parent_revision: Option<u64>,
    pub set_digest: String,
    pub artifact_count: u64,
    pub total_bytes: u64,
    /// Creation timestamp, milliseconds since epoch
    pub created_at: i64,
    /// Publish run that wrote the revision, when known
    pub run_id: Option<String>,
}

impl RevisionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            revision: row.get::<_, i64>(0)? as u64,
            parent_revision: row.get::<_, Option<i64>>(1)?.map(|r| r as u64),
            set_digest: row.get(2)?,
            artifact_count: row.get::<_, i64>(3)? as u64,
            total_bytes: row.get::<_, i64>(4)? as u64,
            created_at: row.get(5)?,
            run_id: row.get(6)?,
        })
    }

    pub fn created_at_utc(&self) -> Result<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.created_at)
            .single()
            .ok_or_else(|| {
                ExError::new(ExErrorKind::CorruptSnapshot)
                    .with_op("revision_row")
                    .with_revision(self.revision)
                    .with_message(format!("invalid created_at {}", self.created_at))
            })
    }

    pub fn summary(&self) -> Result<SnapshotSummary> {
        Ok(SnapshotSummary {
            revision: self.revision,
            parent_revision: self.parent_revision,
            created_at: self.created_at_utc()?,
            set_digest: self.set_digest.clone(),
            artifact_count: self.artifact_count as usize,
            total_bytes: self.total_bytes,
        })
    }
}

/// A raw row from the `revision_artifacts` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRow {
    pub name: String,
    pub blob_digest: String,
    pub size_bytes: u64,
}

const REVISION_COLUMNS: &str =
    "revision, parent_revision, set_digest, artifact_count, total_bytes, created_at, run_id";

/// Latest committed revision, `0` for an empty ledger
pub fn head_revision(conn: &Connection) -> Result<u64> {
    conn.query_row(
        "SELECT COALESCE(MAX(revision), 0) FROM revisions",
        [],
        |row| row.get::<_, i64>(0),
    )
    .map(|r| r as u64)
    .map_err(|e| from_rusqlite("head_revision", e))
}

/// Fetch one revision row.
pub fn fetch_revision_row(conn: &Connection, revision: u64) -> Result<Option<RevisionRow>> {
    conn.query_row(
        &format!("SELECT {REVISION_COLUMNS} FROM revisions WHERE revision = ?1"),
        [revision as i64],
        RevisionRow::from_row,
    )
    .optional()
    .map_err(|e| from_rusqlite("fetch_revision_row", e))
}

/// Fetch a revision's artifact rows in name order.
pub fn fetch_artifact_rows(conn: &Connection, revision: u64) -> Result<Vec<ArtifactRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT name, blob_digest, size_bytes FROM revision_artifacts
             WHERE revision = ?1 ORDER BY name",
        )
        .map_err(|e| from_rusqlite("fetch_artifact_rows", e))?;
    let rows = stmt
        .query_map([revision as i64], |row| {
            Ok(ArtifactRow {
                name: row.get(0)?,
                blob_digest: row.get(1)?,
                size_bytes: row.get::<_, i64>(2)? as u64,
            })
        })
        .map_err(|e| from_rusqlite("fetch_artifact_rows", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| from_rusqlite("fetch_artifact_rows", e))?;
    Ok(rows)
}

/// Revision rows, newest first, at most `limit` when given.
pub fn list_revisions(conn: &Connection, limit: Option<usize>) -> Result<Vec<RevisionRow>> {
    // SQLite treats a negative LIMIT as unbounded
    let limit = limit.map(|l| l as i64).unwrap_or(-1);
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {REVISION_COLUMNS} FROM revisions ORDER BY revision DESC LIMIT ?1"
        ))
        .map_err(|e| from_rusqlite("list_revisions", e))?;
    let rows = stmt
        .query_map([limit], RevisionRow::from_row)
        .map_err(|e| from_rusqlite("list_revisions", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| from_rusqlite("list_revisions", e))?;
    Ok(rows)
}

/// Load a full snapshot, verifying every blob and the set digest.
///
/// Revision `0` is the genesis snapshot.
///
/// # Errors
///
/// - `NotFound`: no such revision
/// - `MissingBlob`: an artifact's blob is absent from the CAS
/// - `CorruptSnapshot`: a blob or the reassembled set fails verification
pub fn load_snapshot(conn: &Connection, cas: &FsStore, revision: u64) -> Result<Snapshot> {
    if revision == Snapshot::GENESIS_REVISION {
        return Ok(Snapshot::genesis());
    }

    let row = fetch_revision_row(conn, revision)?.ok_or_else(|| {
        ExError::new(ExErrorKind::NotFound)
            .with_op("load_snapshot")
            .with_revision(revision)
            .with_message("revision not found")
    })?;

    let mut artifacts = ArtifactSet::new();
    for artifact in fetch_artifact_rows(conn, revision)? {
        let content = cas.read(&artifact.blob_digest).map_err(|e| {
            ExError::new(e.kind())
                .with_op("load_snapshot")
                .with_entity_id(artifact.name.clone())
                .with_revision(revision)
                .with_source(e)
        })?;
        let name = ArtifactName::new(artifact.name.clone())
            .map_err(|e| corrupt(revision, e.to_string()))?;
        artifacts
            .insert_named(name, content)
            .map_err(|e| corrupt(revision, e.to_string()))?;
    }

    let snapshot = Snapshot::new(
        row.revision,
        row.parent_revision,
        row.created_at_utc()?,
        artifacts,
    );
    if snapshot.set_digest() != row.set_digest {
        return Err(corrupt(
            revision,
            format!(
                "set digest {} does not match ledger {}",
                snapshot.set_digest(),
                row.set_digest
            ),
        ));
    }
    Ok(snapshot)
}

fn corrupt(revision: u64, message: String) -> ExError {
    ExError::new(ExErrorKind::CorruptSnapshot)
        .with_op("load_snapshot")
        .with_revision(revision)
        .with_message(message)
}
