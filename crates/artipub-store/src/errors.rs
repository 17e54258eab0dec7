//! Error handling for artipub-store
//!
//! Wraps artipub-core ExError with store-specific helpers

use artipub_core::errors::{ExError, ExErrorKind};
use rusqlite::ErrorCode;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_entity_id(migration_id)
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error for an already applied migration
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_entity_id(migration_id)
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a CAS missing blob error
pub fn cas_missing(digest: &str) -> ExError {
    ExError::new(ExErrorKind::MissingBlob)
        .with_op("cas_read")
        .with_entity_id(digest)
        .with_message("CAS blob not found")
}

/// Create a CAS corruption error: stored bytes no longer hash to their name
pub fn cas_corrupt(digest: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::CorruptSnapshot)
        .with_op("cas_read")
        .with_entity_id(digest)
        .with_message(format!("CAS blob content hashes to {}", actual))
}

/// Create an error from rusqlite::Error
///
/// Lock contention past the busy timeout and unopenable databases become
/// `StoreUnavailable`; everything else is `Persistence`.
pub fn from_rusqlite(op: &str, err: rusqlite::Error) -> ExError {
    let kind = match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(
                failure.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen
            ) =>
        {
            ExErrorKind::StoreUnavailable
        }
        _ => ExErrorKind::Persistence,
    };
    ExError::new(kind).with_op(op).with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
