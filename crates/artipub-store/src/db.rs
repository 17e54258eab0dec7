//! Database connection management
//!
//! Provides utilities for opening and managing SQLite connections

use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Open a SQLite database at the given path and configure it
pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Connection> {
    let conn = Connection::open(path).map_err(|e| from_rusqlite("db_open", e))?;
    configure(&conn, busy_timeout)?;
    Ok(conn)
}

/// Configure a connection for durable, multi-process use
///
/// WAL lets readers proceed while a writer holds the lock; `synchronous =
/// FULL` makes a returned COMMIT durable across power loss.
pub fn configure(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    conn.busy_timeout(busy_timeout)
        .map_err(|e| from_rusqlite("db_configure", e))?;

    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| from_rusqlite("db_configure", e))?;

    // journal_mode returns the resulting mode as a row
    let mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .map_err(|e| from_rusqlite("db_configure", e))?;
    tracing::debug!(journal_mode = %mode, "Configured SQLite journal mode");

    conn.pragma_update(None, "synchronous", "FULL")
        .map_err(|e| from_rusqlite("db_configure", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_enables_wal() {
        let dir = TempDir::new().unwrap();
        let conn = open(dir.path().join("ledger.db"), Duration::from_millis(100)).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
