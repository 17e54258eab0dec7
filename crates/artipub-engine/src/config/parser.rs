//! Config parser with validation

use std::fs;
use std::path::Path;

use artipub_core::errors::Result;

use crate::config::format_v0::{
    config_error, GeneratorKind, PublishConfigV0, MAX_GENERATOR_TIMEOUT_SECS,
};

/// Parse a config file; relative paths in it resolve against its directory
pub fn parse_config_file(path: &Path) -> Result<PublishConfigV0> {
    let content = fs::read_to_string(path).map_err(|e| {
        config_error(&format!("Failed to read config file: {}", e))
            .with_entity_id(path.display().to_string())
    })?;

    let mut config = parse_config_str(&content)?;
    config.base_dir = path.parent().map(Path::to_path_buf);
    Ok(config)
}

/// Parse a config from a string
pub fn parse_config_str(content: &str) -> Result<PublishConfigV0> {
    let config: PublishConfigV0 = serde_yaml::from_str(content)
        .map_err(|e| config_error(&format!("YAML parse error: {}", e)))?;

    validate_config(&config)?;

    Ok(config)
}

/// Validate a config, including one assembled or overridden in code
pub fn validate_config(config: &PublishConfigV0) -> Result<()> {
    if config.schema_version != 0 {
        return Err(config_error(&format!(
            "Unsupported schema_version: {}. Expected 0",
            config.schema_version
        )));
    }

    if config.store.root.as_os_str().is_empty() {
        return Err(config_error("store.root must not be empty"));
    }
    if config.store.busy_timeout_ms == 0 {
        return Err(config_error("store.busy_timeout_ms must be positive"));
    }
    if config.store.keep_exports == 0 {
        return Err(config_error("store.keep_exports must be at least 1"));
    }

    if config.retry.max_attempts == 0 {
        return Err(config_error("retry.max_attempts must be at least 1"));
    }
    if config.retry.backoff_factor == 0 {
        return Err(config_error("retry.backoff_factor must be at least 1"));
    }
    if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
        return Err(config_error(
            "retry.initial_backoff_ms must not exceed retry.max_backoff_ms",
        ));
    }

    if let Some(generator) = &config.generator {
        if generator.timeout_secs == 0 {
            return Err(config_error("generator.timeout_secs must be positive"));
        }
        if generator.timeout_secs > MAX_GENERATOR_TIMEOUT_SECS {
            return Err(config_error(&format!(
                "generator.timeout_secs must not exceed {}",
                MAX_GENERATOR_TIMEOUT_SECS
            )));
        }
        match generator.kind {
            GeneratorKind::Command => {
                match generator.program.as_deref() {
                    Some(program) if !program.trim().is_empty() => {}
                    _ => return Err(config_error("Command generator requires 'program'")),
                }
                if generator.dir.is_some() {
                    return Err(config_error("'dir' only applies to directory generators"));
                }
            }
            GeneratorKind::Directory => {
                if generator.dir.is_none() {
                    return Err(config_error("Directory generator requires 'dir'"));
                }
                if generator.program.is_some()
                    || !generator.args.is_empty()
                    || !generator.stage.is_empty()
                {
                    return Err(config_error(
                        "'program', 'args' and 'stage' only apply to command generators",
                    ));
                }
            }
        }
        if generator.include.iter().any(|name| name.trim().is_empty()) {
            return Err(config_error("generator.include entries must not be empty"));
        }
    }

    Ok(())
}
