//! Sharding logic for CAS
//!
//! Shards blobs into subdirectories based on the first 2 hex characters
//! of the digest to avoid filesystem performance issues with too many
//! files in a single directory.

use std::path::{Path, PathBuf};

/// Extension used for every blob
pub const BLOB_EXTENSION: &str = "bin";

/// Compute the shard path for a given digest
///
/// For digest "abc123...", returns "<root>/ab/abc123....bin"
pub fn shard_path(root: &Path, digest: &str) -> PathBuf {
    let shard = &digest[..2.min(digest.len())];

    root.join(shard).join(format!("{}.{}", digest, BLOB_EXTENSION))
}
