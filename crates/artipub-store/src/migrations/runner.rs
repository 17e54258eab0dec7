//! Migration runner
//!
//! Applies migrations with checksums and idempotency

use crate::errors::{checksum_mismatch, from_rusqlite, migration_error, Result};
use crate::migrations::checksums::compute_checksum;
use crate::migrations::embedded::get_migrations;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};

/// A row of the `schema_version` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub migration_id: String,
    pub applied_at: i64,
    pub checksum: String,
}

/// Apply all pending migrations to the database
///
/// # Errors
///
/// `Persistence` if a migration fails or an applied migration's checksum no
/// longer matches the embedded SQL.
pub fn apply_migrations(conn: &mut Connection) -> Result<()> {
    create_schema_version_table(conn)?;

    for migration in get_migrations() {
        apply_migration(conn, migration.id, migration.sql)?;
    }

    Ok(())
}

/// List applied migrations in application order
pub fn applied_migrations(conn: &Connection) -> Result<Vec<AppliedMigration>> {
    let mut stmt = conn
        .prepare("SELECT migration_id, applied_at, checksum FROM schema_version ORDER BY id")
        .map_err(|e| from_rusqlite("applied_migrations", e))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AppliedMigration {
                migration_id: row.get(0)?,
                applied_at: row.get(1)?,
                checksum: row.get(2)?,
            })
        })
        .map_err(|e| from_rusqlite("applied_migrations", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| from_rusqlite("applied_migrations", e))?;
    Ok(rows)
}

/// Create the schema_version table if it doesn't exist
fn create_schema_version_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY,
            migration_id TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL,
            checksum TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| from_rusqlite("create_schema_version", e))?;

    Ok(())
}

/// Apply a single migration if not already applied
fn apply_migration(conn: &mut Connection, migration_id: &str, sql: &str) -> Result<()> {
    let checksum = compute_checksum(sql);

    // IMMEDIATE takes the write lock up front, so a second process opening
    // the same store waits and then sees the migration as applied.
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| from_rusqlite("apply_migration", e))?;

    let recorded: Option<String> = tx
        .query_row(
            "SELECT checksum FROM schema_version WHERE migration_id = ?1",
            [migration_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| from_rusqlite("apply_migration", e))?;

    if let Some(recorded) = recorded {
        if recorded != checksum {
            return Err(checksum_mismatch(migration_id, &recorded, &checksum));
        }
        return Ok(());
    }

    tx.execute_batch(sql)
        .map_err(|e| migration_error(migration_id, &e.to_string()))?;

    let now = chrono::Utc::now().timestamp();
    tx.execute(
        "INSERT INTO schema_version (migration_id, applied_at, checksum) VALUES (?1, ?2, ?3)",
        rusqlite::params![migration_id, now, checksum],
    )
    .map_err(|e| from_rusqlite("apply_migration", e))?;

    tx.commit().map_err(|e| from_rusqlite("apply_migration", e))?;

    tracing::debug!(migration_id = %migration_id, "Applied migration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_migrations() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        let applied = applied_migrations(&conn).unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].migration_id, "001_publish_ledger");
    }

    #[test]
    fn test_idempotency() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        apply_migrations(&mut conn).unwrap();
        assert_eq!(applied_migrations(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_edited_migration_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        conn.execute(
            "UPDATE schema_version SET checksum = 'stale' WHERE migration_id = '001_publish_ledger'",
            [],
        )
        .unwrap();

        let err = apply_migrations(&mut conn).unwrap_err();
        assert_eq!(err.op(), Some("migration_checksum"));
    }
}
