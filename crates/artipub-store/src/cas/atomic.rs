//! Atomic write primitives
//!
//! Uses temp→fsync→rename so readers never observe a partial file and a
//! completed write survives a crash.

use crate::errors::{io_error, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const TEMP_SUFFIX: &str = ".tmp";

/// Unique sibling temp path for `target`
///
/// Each writer gets its own temp file so concurrent writers of the same
/// target never clobber each other's partial output.
pub fn temp_path_for(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let unique = uuid::Uuid::new_v4().simple().to_string();
    target.with_file_name(format!(".{}.{}{}", file_name, unique, TEMP_SUFFIX))
}

/// Whether a directory entry name is one of our temp files
pub fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}

/// Atomically and durably write bytes to a file
pub fn atomic_write(target_path: &Path, content: &[u8]) -> Result<()> {
    let parent = target_path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| io_error("create_parent_dir", e))?;

    let temp_path = temp_path_for(target_path);
    let written = write_and_sync(&temp_path, content)
        .and_then(|()| fs::rename(&temp_path, target_path));
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(io_error("atomic_write", e));
    }

    sync_dir(parent)
}

fn write_and_sync(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

/// Flush a directory's entries so a preceding rename is durable
#[cfg(unix)]
pub fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| io_error("sync_dir", e))
}

/// Directory handles cannot be synced on this platform
#[cfg(not(unix))]
pub fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

/// Remove temp files and directories under `dir` older than `min_age`.
///
/// Walks subdirectories one level deep, which covers CAS shards. Younger
/// temps may belong to a writer still in progress and are left alone.
/// Returns how many entries were removed.
pub fn sweep_stale_temps(dir: &Path, min_age: Duration) -> Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(io_error("sweep_temps", e)),
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(meta) = entry.metadata() else { continue };

        if !is_temp_name(&name) {
            if meta.is_dir() {
                removed += sweep_shard(&path, now, min_age);
            }
            continue;
        }
        if is_stale(&meta, now, min_age) {
            let result = if meta.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if result.is_ok() {
                removed += 1;
            }
        }
    }
    Ok(removed)
}

fn sweep_shard(dir: &Path, now: SystemTime, min_age: Duration) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| is_temp_name(&e.file_name().to_string_lossy()))
        .filter(|e| {
            e.metadata()
                .map(|m| m.is_file() && is_stale(&m, now, min_age))
                .unwrap_or(false)
        })
        .filter(|e| fs::remove_file(e.path()).is_ok())
        .count()
}

fn is_stale(meta: &fs::Metadata, now: SystemTime, min_age: Duration) -> bool {
    meta.modified()
        .ok()
        .and_then(|modified| now.duration_since(modified).ok())
        .map(|age| age >= min_age)
        .unwrap_or(false)
}
