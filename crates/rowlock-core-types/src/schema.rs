//! Canonical schema constants for structured logging
//!
//! These constants keep field keys and event names consistent between the
//! code that emits events and the tests that assert on them.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_TASK: &str = "task";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";

// Row fields
pub const FIELD_ROW_ID: &str = "row_id";
pub const FIELD_ROWS_AFFECTED: &str = "rows_affected";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Operation boundary events
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Seed loader
pub const EVENT_INSERTED: &str = "inserted";

// Transactional updater
pub const EVENT_START_UPDATE: &str = "start_update";
pub const EVENT_BEFORE_SLEEP: &str = "before_sleep";
pub const EVENT_AFTER_SLEEP: &str = "after_sleep";
pub const EVENT_COMMITTED: &str = "committed";
pub const EVENT_ROLLED_BACK: &str = "rolled_back";

// Interceptor
pub const EVENT_START_INTERCEPT: &str = "start_intercept";
pub const EVENT_UPDATED: &str = "updated";
pub const EVENT_QUERYING: &str = "querying";
pub const EVENT_COMPLETED: &str = "completed";

// Orchestrator
/// The store serialises all writers, so the free row waits too
pub const EVENT_NO_ROW_LOCKS: &str = "no_row_locks";
pub const EVENT_TERMINATING: &str = "terminating";
