//! Filesystem-based Content-Addressable Storage
//!
//! Provides durable atomic writes and digest-verified reads

use crate::cas::atomic::atomic_write;
use crate::cas::sharding::shard_path;
use crate::errors::{cas_corrupt, cas_missing, io_error, Result};
use artipub_core::model::content_digest;
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem-based CAS store
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a new CAS store at the given root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write content to CAS and return the digest
    ///
    /// - Computes the SHA256 digest
    /// - Writes atomically and durably using temp→fsync→rename
    /// - Idempotent: writing the same content twice succeeds
    /// - Self-healing: an existing blob that fails verification is rewritten
    pub fn write(&self, content: &[u8]) -> Result<String> {
        let digest = content_digest(content);
        let target_path = shard_path(&self.root, &digest);

        if target_path.exists() {
            let existing = fs::read(&target_path).map_err(|e| io_error("read_cas", e))?;
            if content_digest(&existing) == digest {
                return Ok(digest);
            }
            tracing::warn!(digest = %digest, "Rewriting corrupt CAS blob");
        }

        atomic_write(&target_path, content)?;

        Ok(digest)
    }

    /// Read content from CAS by digest, verifying it
    ///
    /// # Errors
    ///
    /// - `MissingBlob` if no blob exists for the digest
    /// - `CorruptSnapshot` if the bytes no longer hash to the digest
    pub fn read(&self, digest: &str) -> Result<Vec<u8>> {
        let path = shard_path(&self.root, digest);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(cas_missing(digest));
            }
            Err(e) => return Err(io_error("read_cas", e)),
        };

        let actual = content_digest(&content);
        if actual != digest {
            return Err(cas_corrupt(digest, &actual));
        }
        Ok(content)
    }

    /// Whether a blob exists for the digest (unverified)
    pub fn contains(&self, digest: &str) -> bool {
        shard_path(&self.root, digest).is_file()
    }

    /// On-disk location of a blob
    pub fn blob_path(&self, digest: &str) -> PathBuf {
        shard_path(&self.root, digest)
    }
}
