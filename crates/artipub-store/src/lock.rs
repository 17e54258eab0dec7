//! Cross-process exclusive lock backed by a SQLite file
//!
//! Holding an `EXCLUSIVE` transaction on a dedicated database serializes
//! every holder of the same path, in this process or any other, and the
//! lock is released when the holder is dropped or its process dies.

use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// An acquired lock; released on drop.
pub struct FileLock {
    conn: Connection,
}

impl FileLock {
    /// Block until the lock at `path` is free, at most `timeout`.
    ///
    /// # Errors
    ///
    /// `StoreUnavailable` if another holder keeps it past `timeout`.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| from_rusqlite("lock_open", e))?;
        conn.busy_timeout(timeout)
            .map_err(|e| from_rusqlite("lock_open", e))?;
        conn.execute_batch("BEGIN EXCLUSIVE")
            .map_err(|e| from_rusqlite("lock_acquire", e))?;
        Ok(Self { conn })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.conn.execute_batch("ROLLBACK");
    }
}
