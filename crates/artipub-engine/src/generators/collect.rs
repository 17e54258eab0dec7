//! Directory tree → ArtifactSet

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use artipub_core::errors::Result;
use artipub_core::model::ArtifactSet;
use walkdir::WalkDir;

use super::generator_error;

/// Read every regular file under `dir` into an artifact set.
///
/// Names are `/`-joined paths relative to `dir`. Symlinks are followed.
/// A non-empty `include` keeps only names equal to an entry or under an
/// entry treated as a directory; every entry must match at least one file.
/// Names in `exclude` are skipped.
///
/// # Errors
///
/// `GeneratorError` if the tree cannot be read, a name is not UTF-8 or not
/// a valid artifact name, or an `include` entry matched nothing.
pub fn collect_tree(dir: &Path, include: &[String], exclude: &[String]) -> Result<ArtifactSet> {
    const OP: &str = "collect_tree";

    if !dir.is_dir() {
        return Err(generator_error(OP, "Output directory does not exist")
            .with_entity_id(dir.display().to_string()));
    }

    let include: Vec<&str> = include
        .iter()
        .map(|entry| entry.trim_matches('/'))
        .collect();
    let mut matched: BTreeSet<&str> = BTreeSet::new();
    let mut artifacts = ArtifactSet::new();

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            generator_error(OP, format!("Failed to walk output directory: {}", e))
                .with_entity_id(dir.display().to_string())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(dir).map_err(|e| {
            generator_error(OP, format!("Path escaped output directory: {}", e))
                .with_entity_id(entry.path().display().to_string())
        })?;
        let segments: Option<Vec<&str>> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect();
        let Some(segments) = segments else {
            return Err(generator_error(OP, "Output file name is not valid UTF-8")
                .with_entity_id(entry.path().display().to_string()));
        };
        let name = segments.join("/");

        if exclude.iter().any(|skip| skip == &name) {
            continue;
        }
        if !include.is_empty() {
            match include.iter().find(|entry| covers(entry, &name)) {
                Some(entry) => {
                    matched.insert(*entry);
                }
                None => continue,
            }
        }

        let content = fs::read(entry.path()).map_err(|e| {
            generator_error(OP, format!("Failed to read output file: {}", e))
                .with_entity_id(name.clone())
        })?;
        artifacts.insert(name, content).map_err(|e| {
            generator_error(OP, "Output file is not a valid artifact").with_source(e.into())
        })?;
    }

    if let Some(missing) = include.iter().find(|entry| !matched.contains(*entry)) {
        return Err(generator_error(OP, "Expected output was not produced")
            .with_entity_id(missing.to_string()));
    }

    Ok(artifacts)
}

fn covers(entry: &str, name: &str) -> bool {
    name == entry
        || name
            .strip_prefix(entry)
            .is_some_and(|rest| rest.starts_with('/'))
}
