//! Concrete artifact generators
//!
//! - `DirectoryGenerator` snapshots an existing directory tree
//! - `CommandGenerator` runs a program in a scratch directory and collects
//!   what it wrote
//! - `generate_with_timeout` bounds any generator by a deadline

mod collect;
pub mod command;
pub mod directory;
pub mod timeout;

pub use collect::collect_tree;
pub use command::{CommandGenerator, OUTPUT_DIR_ENV};
pub use directory::DirectoryGenerator;
pub use timeout::generate_with_timeout;

use artipub_core::errors::{ExError, ExErrorKind};

pub(crate) fn generator_error(op: &str, message: impl Into<String>) -> ExError {
    ExError::new(ExErrorKind::GeneratorError)
        .with_op(op)
        .with_message(message)
}
