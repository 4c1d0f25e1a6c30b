//! Canonical logging macros

/// Log one step of an experiment task as `[<task>]: <text>`
///
/// Structured fields go in an optional braced block before the message.
///
/// # Example
///
/// ```
/// # use rowlock_core::log_task;
/// # use rowlock_core::core_types::schema::{EVENT_START_UPDATE, EVENT_UPDATED};
/// log_task!("john", "tx_update", EVENT_START_UPDATE, "start update");
/// let rows = 1u64;
/// log_task!("jane", "intercept", EVENT_UPDATED, { rows_affected = rows }, "updated, {} rows affected", rows);
/// ```
#[macro_export]
macro_rules! log_task {
    ($task:expr, $op:expr, $event:expr, { $($field:tt)* }, $($arg:tt)+) => {{
        let message = format!($($arg)+);
        tracing::info!(
            component = module_path!(),
            op = $op,
            task = %$task,
            event = $event,
            $($field)*,
            "[{}]: {}",
            $task,
            message
        );
    }};
    ($task:expr, $op:expr, $event:expr, $($arg:tt)+) => {{
        let message = format!($($arg)+);
        tracing::info!(
            component = module_path!(),
            op = $op,
            task = %$task,
            event = $event,
            "[{}]: {}",
            $task,
            message
        );
    }};
}

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use rowlock_core::log_op_start;
/// log_op_start!("experiment");
/// log_op_start!("setup", backend = "sqlite");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use rowlock_core::log_op_end;
/// log_op_end!("experiment", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// Accepts an `ExError` or a reference to one.
///
/// # Example
///
/// ```
/// # use rowlock_core::log_op_error;
/// # use rowlock_core::errors::{ExError, ExErrorKind};
/// let err = ExError::new(ExErrorKind::Store).with_message("insert failed");
/// log_op_error!("insert_row", &err, duration_ms = 3);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let ex_err_ref = &$err;
        let ex_err: &$crate::errors::ExError = ::core::borrow::Borrow::borrow(ex_err_ref);
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            "{}",
            ex_err
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let ex_err_ref = &$err;
        let ex_err: &$crate::errors::ExError = ::core::borrow::Borrow::borrow(ex_err_ref);
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            $($field)*,
            "{}",
            ex_err
        );
    }};
}
