//! Logging initialization module
//!
//! Provides a single initialization point for the logging facility.

use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

use crate::errors::{ExError, ExErrorKind, Result};

/// Log targets covered by the default filter
const CRATE_TARGETS: [&str; 4] = ["artipub_core", "artipub_store", "artipub_engine", "artipub_cli"];

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output for development
    Development,
    /// JSON structured output for production
    Production,
    /// Test capture mode for deterministic testing
    Test,
}

impl Profile {
    fn default_level(&self) -> &'static str {
        match self {
            Profile::Development => "debug",
            Profile::Production | Profile::Test => "info",
        }
    }

    fn default_filter(&self) -> String {
        let level = self.default_level();
        CRATE_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

static INIT_ONCE: Once = Once::new();

/// Initialize the logging facility
///
/// Call once at application startup. Logs go to stderr so that command
/// output on stdout stays machine-readable.
///
/// # Profiles
///
/// - **Development**: Human-readable logs with debug level
/// - **Production**: JSON structured logs with info level
/// - **Test**: Bare registry; use `test_capture::init_test_capture` to assert on events
///
/// # Example
///
/// ```
/// use artipub_core::logging_facility::{init, Profile};
///
/// init(Profile::Development);
/// ```
pub fn init(profile: Profile) {
    let filter =
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(profile.default_filter()));
    install(profile, filter);
}

/// Initialize with an explicit filter directive, ignoring `RUST_LOG`.
///
/// A bare level such as `warn` applies to every artipub crate; anything
/// else is passed to `EnvFilter` as written.
///
/// # Errors
///
/// `InvalidInput` if the directive does not parse.
pub fn init_with_filter(profile: Profile, directive: &str) -> Result<()> {
    let directive = match directive {
        "trace" | "debug" | "info" | "warn" | "error" | "off" => CRATE_TARGETS
            .iter()
            .map(|target| format!("{target}={directive}"))
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    };
    let filter = EnvFilter::try_new(&directive).map_err(|e| {
        ExError::new(ExErrorKind::InvalidInput)
            .with_op("logging_init")
            .with_entity_id(directive.clone())
            .with_message(format!("invalid log filter: {e}"))
    })?;
    install(profile, filter);
    Ok(())
}

fn install(profile: Profile, filter: EnvFilter) {
    INIT_ONCE.call_once(|| {
        // try_init: a test harness may already own the global subscriber
        let _ = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .try_init()
                .ok(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .try_init()
                .ok(),
            Profile::Test => tracing_subscriber::registry().try_init().ok(),
        };
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_idempotent() {
        init(Profile::Test);
        init(Profile::Test);
        init(Profile::Test);
    }

    #[test]
    fn test_default_filter_names_every_crate() {
        let filter = Profile::Production.default_filter();
        assert_eq!(
            filter,
            "artipub_core=info,artipub_store=info,artipub_engine=info,artipub_cli=info"
        );
        assert!(Profile::Development.default_filter().contains("artipub_store=debug"));
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let err = init_with_filter(Profile::Test, "artipub_core=notalevel").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }
}
