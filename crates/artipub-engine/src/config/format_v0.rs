//! Config Format v0 schema
//!
//! Defines the YAML structure of a publish configuration and how it resolves
//! into store options, a retry policy and a generator.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use artipub_core::errors::{ExError, ExErrorKind, Result};
use artipub_core::generator::ArtifactGenerator;
use artipub_store::StoreOptions;
use serde::{Deserialize, Serialize};

use crate::generators::{CommandGenerator, DirectoryGenerator};
use crate::retry::{
    RetryPolicy, DEFAULT_BACKOFF_FACTOR, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_BACKOFF_MS,
};

/// Default store root, relative to the config file
pub const DEFAULT_STORE_ROOT: &str = ".artipub";

/// Default generator deadline
pub const DEFAULT_GENERATOR_TIMEOUT_SECS: u64 = 600;

const COMMAND_REAP_GRACE: Duration = Duration::from_secs(2);

/// Upper bound accepted for `generator.timeout_secs` (one year)
pub const MAX_GENERATOR_TIMEOUT_SECS: u64 = 365 * 24 * 60 * 60;

/// Top-level config file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishConfigV0 {
    /// Schema version (must be 0 for this format)
    pub schema_version: u32,

    #[serde(default)]
    pub store: StoreSection,

    /// Required unless supplied on the command line
    #[serde(default)]
    pub generator: Option<GeneratorSection>,

    #[serde(default)]
    pub retry: RetrySection,

    /// Directory relative paths resolve against (the config file's directory)
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Default for PublishConfigV0 {
    fn default() -> Self {
        Self {
            schema_version: 0,
            store: StoreSection::default(),
            generator: None,
            retry: RetrySection::default(),
            base_dir: None,
        }
    }
}

/// Where and how snapshots are kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    #[serde(default = "default_store_root")]
    pub root: PathBuf,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_keep_exports")]
    pub keep_exports: usize,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            root: default_store_root(),
            busy_timeout_ms: default_busy_timeout_ms(),
            keep_exports: default_keep_exports(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    /// Run an external program and collect what it writes
    Command,
    /// Read an existing directory tree
    Directory,
}

/// Which generator produces the artifact set
///
/// `program`/`args`/`stage` apply to `command`, `dir` to `directory`;
/// `include` and `timeout_secs` to both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorSection {
    pub kind: GeneratorKind,

    #[serde(default)]
    pub program: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    /// Files copied into the command's working directory before it runs
    #[serde(default)]
    pub stage: Vec<PathBuf>,

    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Restrict the collected artifacts to these names or directory prefixes
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default = "default_generator_timeout_secs")]
    pub timeout_secs: u64,
}

impl GeneratorSection {
    /// Command generator section with defaults for everything else
    pub fn command(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind: GeneratorKind::Command,
            program: Some(program.into()),
            args,
            stage: Vec::new(),
            dir: None,
            include: Vec::new(),
            timeout_secs: default_generator_timeout_secs(),
        }
    }

    /// Directory generator section with defaults for everything else
    pub fn directory(dir: impl Into<PathBuf>) -> Self {
        Self {
            kind: GeneratorKind::Directory,
            program: None,
            args: Vec::new(),
            stage: Vec::new(),
            dir: Some(dir.into()),
            include: Vec::new(),
            timeout_secs: default_generator_timeout_secs(),
        }
    }
}

/// Conflict retry tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_factor: default_backoff_factor(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_store_root() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_ROOT)
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_keep_exports() -> usize {
    3
}

fn default_generator_timeout_secs() -> u64 {
    DEFAULT_GENERATOR_TIMEOUT_SECS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_initial_backoff_ms() -> u64 {
    DEFAULT_INITIAL_BACKOFF_MS
}

fn default_backoff_factor() -> u32 {
    DEFAULT_BACKOFF_FACTOR
}

fn default_max_backoff_ms() -> u64 {
    DEFAULT_MAX_BACKOFF_MS
}

impl PublishConfigV0 {
    /// Resolve `path` against the config file's directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Absolute (or CWD-relative) store root
    pub fn store_root(&self) -> PathBuf {
        self.resolve_path(&self.store.root)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            busy_timeout: Duration::from_millis(self.store.busy_timeout_ms),
            keep_exports: self.store.keep_exports,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            backoff_factor: self.retry.backoff_factor,
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }

    /// Outer deadline for one generator invocation, if a generator is configured.
    ///
    /// Command generators kill their program at `timeout_secs`; the outer
    /// bound waits a little longer so the child is reaped first.
    pub fn generator_timeout(&self) -> Option<Duration> {
        self.generator.as_ref().map(|g| {
            let timeout = Duration::from_secs(g.timeout_secs);
            match g.kind {
                GeneratorKind::Command => timeout.saturating_add(COMMAND_REAP_GRACE),
                GeneratorKind::Directory => timeout,
            }
        })
    }

    /// Build the configured generator.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if no generator is configured or its section is
    /// missing the field its kind requires.
    pub fn build_generator(&self) -> Result<Arc<dyn ArtifactGenerator>> {
        let section = self
            .generator
            .as_ref()
            .ok_or_else(|| config_error("No generator configured"))?;

        match section.kind {
            GeneratorKind::Command => {
                let program = section
                    .program
                    .as_deref()
                    .ok_or_else(|| config_error("Command generator requires 'program'"))?;
                let generator = CommandGenerator::new(program)
                    .with_args(section.args.clone())
                    .with_stage(section.stage.iter().map(|p| self.resolve_path(p)).collect())
                    .with_include(section.include.clone())
                    .with_timeout(Duration::from_secs(section.timeout_secs));
                Ok(Arc::new(generator))
            }
            GeneratorKind::Directory => {
                let dir = section
                    .dir
                    .as_deref()
                    .ok_or_else(|| config_error("Directory generator requires 'dir'"))?;
                let generator = DirectoryGenerator::new(self.resolve_path(dir))
                    .with_include(section.include.clone());
                Ok(Arc::new(generator))
            }
        }
    }
}

pub(crate) fn config_error(message: &str) -> ExError {
    ExError::new(ExErrorKind::InvalidConfig)
        .with_op("load_config")
        .with_message(message)
}
