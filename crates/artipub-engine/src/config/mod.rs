//! Publish configuration
//!
//! A YAML file (`schema_version: 0`) naming the store root, the generator to
//! run and the conflict retry policy.

pub mod format_v0;
pub mod parser;

pub use format_v0::{GeneratorKind, GeneratorSection, PublishConfigV0, RetrySection, StoreSection};
pub use parser::{parse_config_file, parse_config_str, validate_config};
