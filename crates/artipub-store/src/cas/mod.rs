//! Content-Addressable Storage (CAS)
//!
//! Provides:
//! - Filesystem-based CAS with durable atomic writes
//! - Digest verification on read
//! - Sharding by first 2 hex chars of digest

mod atomic;
mod fs_store;
mod sharding;

pub use atomic::{atomic_write, is_temp_name, sweep_stale_temps, sync_dir, temp_path_for};
pub use fs_store::FsStore;
