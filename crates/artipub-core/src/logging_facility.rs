//! Structured logging facility
//!
//! One initialization point plus canonical macros so that every crate logs
//! operations with the same `component`/`op`/`event` fields.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, init_with_filter, Profile};
