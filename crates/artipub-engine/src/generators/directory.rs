//! Generator that snapshots an existing directory tree.

use std::path::{Path, PathBuf};

use artipub_core::errors::Result;
use artipub_core::generator::ArtifactGenerator;
use artipub_core::model::ArtifactSet;

use super::collect_tree;

/// Reads every regular file under a directory on each call.
///
/// Useful when something else (a build, a cron job) writes the outputs and
/// the pipeline only has to publish them.
#[derive(Debug, Clone)]
pub struct DirectoryGenerator {
    dir: PathBuf,
    include: Vec<String>,
}

impl DirectoryGenerator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            include: Vec::new(),
        }
    }

    /// Only collect these names or directory prefixes
    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactGenerator for DirectoryGenerator {
    fn generate(&self) -> Result<ArtifactSet> {
        collect_tree(&self.dir, &self.include, &[])
    }

    fn describe(&self) -> String {
        format!("directory({})", self.dir.display())
    }
}
