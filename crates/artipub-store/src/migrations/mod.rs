//! Migration framework
//!
//! Provides:
//! - Migration runner with checksums
//! - Idempotent application, safe against concurrent openers
//! - Embedded SQL migrations

mod checksums;
mod embedded;
mod runner;

pub use runner::{applied_migrations, apply_migrations, AppliedMigration};
