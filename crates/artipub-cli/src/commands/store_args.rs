//! Store selection shared by commands

use std::path::{Path, PathBuf};

use artipub_core::errors::{ExError, ExErrorKind, Result};
use artipub_engine::config::{parse_config_file, PublishConfigV0};
use artipub_store::SqliteSnapshotStore;
use clap::Args;

#[derive(Debug, Args)]
pub struct StoreArgs {
    /// YAML config file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Store root directory (overrides the config file)
    #[arg(long, value_name = "DIR")]
    pub store: Option<PathBuf>,
}

impl StoreArgs {
    /// Config file contents with `--store` applied, or defaults
    pub fn load_config(&self) -> Result<PublishConfigV0> {
        let mut config = match &self.config {
            Some(path) => parse_config_file(path)?,
            None => PublishConfigV0::default(),
        };
        if let Some(root) = &self.store {
            config.store.root = absolutize(root)?;
        }
        Ok(config)
    }

    pub fn open_store(&self) -> Result<SqliteSnapshotStore> {
        let config = self.load_config()?;
        SqliteSnapshotStore::open(config.store_root(), config.store_options())
    }
}

/// Command-line paths are relative to the working directory, not the config file
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| {
        ExError::new(ExErrorKind::Io)
            .with_op("resolve_path")
            .with_message(format!("Failed to read working directory: {}", e))
    })?;
    Ok(cwd.join(path))
}
