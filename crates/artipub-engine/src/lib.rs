//! artipub Engine - Orchestration layer
//!
//! Runs the publish cycle: read the current snapshot, regenerate, diff, and
//! commit only when something changed, retrying on concurrent modification.
//!
//! Also provides the concrete generators (directory and external command)
//! and the YAML configuration that wires a store and a generator together.

#![allow(clippy::result_large_err)]

pub mod config;
pub mod coordinator;
pub mod generators;
pub mod retry;

pub use config::{parse_config_file, parse_config_str, PublishConfigV0};
pub use coordinator::{PublishCoordinator, PublishOptions, PublishReceipt, PublishResult};
pub use generators::{generate_with_timeout, CommandGenerator, DirectoryGenerator};
pub use retry::RetryPolicy;
