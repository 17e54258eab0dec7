//! Canonical logging macros
//!
//! Every operation logs a `start` event and exactly one of `end` or
//! `end_error`, tagged with the calling module as `component`.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use artipub_core::log_op_start;
/// log_op_start!("publish_run");
/// log_op_start!("publish_run", run_id = "r-1");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::artipub_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::artipub_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use artipub_core::log_op_end;
/// log_op_end!("publish_run", duration_ms = 42);
/// log_op_end!("publish_run", duration_ms = 42, revision = 7u64);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::artipub_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::artipub_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// Accepts anything convertible into `ExError`, including `&ExError`.
///
/// # Example
///
/// ```
/// # use artipub_core::{log_op_error, errors::{ExError, ExErrorKind}};
/// let err = ExError::new(ExErrorKind::GeneratorTimeout);
/// log_op_error!("publish_run", &err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let ex_err: $crate::errors::ExError = ($err).into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::artipub_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            error = %ex_err,
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let ex_err: $crate::errors::ExError = ($err).into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::artipub_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            error = %ex_err,
            $($field)*
        );
    }};
}
