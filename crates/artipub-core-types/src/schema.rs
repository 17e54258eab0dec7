//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";

// Publish cycle identifiers
pub const FIELD_REVISION: &str = "revision";
pub const FIELD_BASE_REVISION: &str = "base_revision";
pub const FIELD_ATTEMPT: &str = "attempt";
pub const FIELD_ARTIFACT: &str = "artifact";

// Collection sizes
pub const FIELD_ARTIFACT_COUNT: &str = "artifact_count";
pub const FIELD_CHANGE_COUNT: &str = "change_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
