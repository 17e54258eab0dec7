//! File-tree export of published revisions.
//!
//! Layout under the store root:
//!
//! ```text
//! exports/<revision>/...   one immutable tree per exported revision
//! current -> exports/<N>   symlink swapped atomically on each publish
//! current.json             pointer document for the current revision
//! ```
//!
//! Callers serialize exports with the store's export lock.
//!
//! Exports are derived data. The ledger stays authoritative, so a failed or
//! stale export is repaired from it at any later time.

use crate::cas::{atomic_write, sync_dir, temp_path_for};
use crate::errors::{io_error, Result};
use artipub_core::errors::{ExError, ExErrorKind};
use artipub_core::model::{ArtifactEntry, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const EXPORTS_DIR: &str = "exports";
pub const CURRENT_LINK: &str = "current";
pub const CURRENT_POINTER: &str = "current.json";

/// Contents of `current.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentPointer {
    pub revision: u64,
    pub set_digest: String,
    pub created_at: DateTime<Utc>,
    pub artifacts: Vec<ArtifactEntry>,
}

impl CurrentPointer {
    pub fn for_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            revision: snapshot.revision(),
            set_digest: snapshot.set_digest().to_string(),
            created_at: snapshot.created_at(),
            artifacts: snapshot.entries(),
        }
    }
}

/// Read `current.json`; `None` if absent or unreadable.
pub fn read_pointer(root: &Path) -> Option<CurrentPointer> {
    let path = root.join(CURRENT_POINTER);
    let bytes = fs::read(&path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(pointer) => Some(pointer),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Ignoring unreadable pointer document"
            );
            None
        }
    }
}

/// Whether the exported state already reflects `snapshot`
pub fn is_exported(root: &Path, snapshot: &Snapshot) -> bool {
    let pointer_matches = read_pointer(root)
        .map(|p| p.revision == snapshot.revision() && p.set_digest == snapshot.set_digest())
        .unwrap_or(false);
    pointer_matches && tree_matches(&root.join(CURRENT_LINK), snapshot)
}

/// Whether the files under `dir` are exactly the snapshot's artifacts
pub fn tree_matches(dir: &Path, snapshot: &Snapshot) -> bool {
    if !dir.is_dir() {
        return false;
    }
    let mut files = 0usize;
    for entry in WalkDir::new(dir).follow_links(true).min_depth(1) {
        let Ok(entry) = entry else { return false };
        if !entry.file_type().is_file() {
            continue;
        }
        files += 1;
        let Some(name) = relative_name(dir, entry.path()) else {
            return false;
        };
        let Some(expected) = snapshot.artifacts().get(&name) else {
            return false;
        };
        match fs::read(entry.path()) {
            Ok(actual) if actual == expected => {}
            _ => return false,
        }
    }
    files == snapshot.artifacts().len()
}

fn relative_name(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let segments: Option<Vec<&str>> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect();
    Some(segments?.join("/"))
}

/// Materialize `snapshot` as `exports/<revision>/` and return its path.
///
/// The tree is built in a temp directory and renamed into place, so an
/// export directory is either absent or complete. An existing export that no
/// longer matches is rebuilt.
pub fn export_tree(root: &Path, snapshot: &Snapshot) -> Result<PathBuf> {
    if let Some((file, nested)) = snapshot.artifacts().path_conflict() {
        return Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("export_tree")
            .with_entity_id(nested.as_str())
            .with_revision(snapshot.revision())
            .with_message(format!("'{}' is both a file and a directory", file)));
    }

    let exports = root.join(EXPORTS_DIR);
    fs::create_dir_all(&exports).map_err(|e| io_error("export_tree", e))?;
    let target = exports.join(snapshot.revision().to_string());

    if tree_matches(&target, snapshot) {
        return Ok(target);
    }
    if target.exists() {
        tracing::warn!(path = %target.display(), "Rebuilding mismatched export");
        fs::remove_dir_all(&target).map_err(|e| io_error("export_tree", e))?;
    }

    let staging = temp_path_for(&target);
    if let Err(e) = write_tree(&staging, snapshot) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    if let Err(e) = fs::rename(&staging, &target) {
        let _ = fs::remove_dir_all(&staging);
        // Another exporter finished the same revision first
        if tree_matches(&target, snapshot) {
            return Ok(target);
        }
        return Err(io_error("export_tree", e));
    }
    sync_dir(&exports)?;

    Ok(target)
}

fn write_tree(dir: &Path, snapshot: &Snapshot) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| io_error("export_tree", e))?;
    for (name, content) in snapshot.artifacts().iter() {
        let path = name.segments().fold(dir.to_path_buf(), |p, s| p.join(s));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error("export_tree", e))?;
        }
        let mut file = fs::File::create(&path).map_err(|e| io_error("export_tree", e))?;
        std::io::Write::write_all(&mut file, content).map_err(|e| io_error("export_tree", e))?;
        file.sync_all().map_err(|e| io_error("export_tree", e))?;
    }
    Ok(())
}

/// Point `<root>/current` at `exports/<revision>`.
#[cfg(unix)]
fn swap_current(root: &Path, revision: u64) -> Result<()> {
    let link = root.join(CURRENT_LINK);
    let staging = temp_path_for(&link);
    let relative_target = Path::new(EXPORTS_DIR).join(revision.to_string());

    std::os::unix::fs::symlink(&relative_target, &staging)
        .map_err(|e| io_error("swap_current", e))?;

    // A real directory cannot be replaced by rename
    if let Ok(meta) = fs::symlink_metadata(&link) {
        if meta.is_dir() {
            fs::remove_dir_all(&link).map_err(|e| io_error("swap_current", e))?;
        }
    }

    if let Err(e) = fs::rename(&staging, &link) {
        let _ = fs::remove_file(&staging);
        return Err(io_error("swap_current", e));
    }
    sync_dir(root)
}

/// Without symlinks, `current` is a copy replaced by remove + rename.
#[cfg(not(unix))]
fn swap_current(root: &Path, revision: u64) -> Result<()> {
    let link = root.join(CURRENT_LINK);
    let source = root.join(EXPORTS_DIR).join(revision.to_string());
    let staging = temp_path_for(&link);

    for entry in WalkDir::new(&source).min_depth(1) {
        let entry = entry.map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("swap_current")
                .with_message(e.to_string())
        })?;
        let Ok(relative) = entry.path().strip_prefix(&source) else {
            continue;
        };
        let dest = staging.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(|e| io_error("swap_current", e))?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| io_error("swap_current", e))?;
            }
            fs::copy(entry.path(), &dest).map_err(|e| io_error("swap_current", e))?;
        }
    }
    fs::create_dir_all(&staging).map_err(|e| io_error("swap_current", e))?;

    if link.exists() {
        fs::remove_dir_all(&link).map_err(|e| io_error("swap_current", e))?;
    }
    fs::rename(&staging, &link).map_err(|e| io_error("swap_current", e))
}

/// Export `snapshot` and make it the `current` tree.
///
/// Never moves the pointer backwards: if `current.json` already names a
/// newer revision this is a no-op.
pub fn publish_export(root: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(pointer) = read_pointer(root) {
        if pointer.revision > snapshot.revision() {
            tracing::debug!(
                revision = snapshot.revision(),
                pointer_revision = pointer.revision,
                "Skipping export older than current pointer"
            );
            return Ok(());
        }
    }

    export_tree(root, snapshot)?;
    swap_current(root, snapshot.revision())?;

    let pointer = CurrentPointer::for_snapshot(snapshot);
    let json = serde_json::to_vec_pretty(&pointer)?;
    atomic_write(&root.join(CURRENT_POINTER), &json)?;

    tracing::debug!(
        revision = snapshot.revision(),
        artifact_count = snapshot.artifacts().len(),
        "Exported current tree"
    );
    Ok(())
}

/// Remove export trees beyond the newest `keep`, never `current_revision`.
///
/// Returns how many were removed. Removal failures are logged and skipped.
pub fn prune_exports(root: &Path, keep: usize, current_revision: u64) -> Result<usize> {
    let exports = root.join(EXPORTS_DIR);
    let entries = match fs::read_dir(&exports) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(io_error("prune_exports", e)),
    };

    let mut revisions: Vec<u64> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().and_then(|n| n.parse().ok()))
        .collect();
    revisions.sort_unstable_by(|a, b| b.cmp(a));

    let mut removed = 0;
    for revision in revisions.into_iter().skip(keep.max(1)) {
        if revision == current_revision {
            continue;
        }
        let path = exports.join(revision.to_string());
        match fs::remove_dir_all(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to prune export"),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use artipub_core::model::ArtifactSet;
    use tempfile::TempDir;

    fn snapshot(revision: u64, pairs: &[(&str, &str)]) -> Snapshot {
        let set = ArtifactSet::from_pairs(pairs.iter().copied()).unwrap();
        Snapshot::new(revision, Some(revision - 1), Utc::now(), set)
    }

    #[test]
    fn test_publish_export_writes_tree_and_pointer() {
        let dir = TempDir::new().unwrap();
        let snap = snapshot(1, &[("a.json", "1"), ("nested/b.txt", "b")]);

        publish_export(dir.path(), &snap).unwrap();

        let current = dir.path().join(CURRENT_LINK);
        assert_eq!(fs::read(current.join("a.json")).unwrap(), b"1");
        assert_eq!(fs::read(current.join("nested").join("b.txt")).unwrap(), b"b");
        let pointer = read_pointer(dir.path()).unwrap();
        assert_eq!(pointer.revision, 1);
        assert_eq!(pointer.artifacts.len(), 2);
        assert!(is_exported(dir.path(), &snap));
    }

    #[test]
    fn test_pointer_never_moves_backwards() {
        let dir = TempDir::new().unwrap();
        publish_export(dir.path(), &snapshot(2, &[("a", "2")])).unwrap();
        publish_export(dir.path(), &snapshot(1, &[("a", "1")])).unwrap();

        assert_eq!(read_pointer(dir.path()).unwrap().revision, 2);
        assert_eq!(fs::read(dir.path().join(CURRENT_LINK).join("a")).unwrap(), b"2");
    }

    #[test]
    fn test_mismatched_export_is_rebuilt() {
        let dir = TempDir::new().unwrap();
        let snap = snapshot(1, &[("a", "1")]);
        let target = export_tree(dir.path(), &snap).unwrap();
        fs::write(target.join("a"), b"tampered").unwrap();
        fs::write(target.join("stray"), b"x").unwrap();

        export_tree(dir.path(), &snap).unwrap();
        assert!(tree_matches(&target, &snap));
    }

    #[test]
    fn test_prune_keeps_newest_and_current() {
        let dir = TempDir::new().unwrap();
        for rev in 1..=5 {
            export_tree(dir.path(), &snapshot(rev, &[("a", "x")])).unwrap();
        }
        let removed = prune_exports(dir.path(), 2, 1).unwrap();
        assert_eq!(removed, 2);
        let exports = dir.path().join(EXPORTS_DIR);
        assert!(exports.join("5").exists());
        assert!(exports.join("4").exists());
        assert!(!exports.join("3").exists());
        assert!(!exports.join("2").exists());
        assert!(exports.join("1").exists());
    }

    #[test]
    fn test_path_conflict_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = export_tree(dir.path(), &snapshot(1, &[("a", "1"), ("a/b", "2")])).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }
}
