//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Entity identifiers
pub const FIELD_QUERY_ID: &str = "query_id";
pub const FIELD_RUN_ID: &str = "run_id";
pub const FIELD_MODULE: &str = "module";
pub const FIELD_VERSION: &str = "version";

// Collection sizes
pub const FIELD_PROFILE_COUNT: &str = "profile_count";
pub const FIELD_MUTATOR_COUNT: &str = "mutator_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_SKIP: &str = "skip";
