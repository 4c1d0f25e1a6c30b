//! Interceptor
//!
//! A conditional write outside any transaction followed by a read-back. The
//! rows-affected count is the observable signal: 0 means the predicate saw
//! the updater's flag, 1 means the row was free.

#![allow(clippy::result_large_err)]

use crate::core_types::schema::{
    EVENT_COMPLETED, EVENT_QUERYING, EVENT_START_INTERCEPT, EVENT_UPDATED,
};
use crate::errors::{ExError, Result};
use crate::log_task;
use crate::model::{InterceptOutcome, RowId, TaskName, SENTINEL_NAME};
use crate::store::RowSession;

const OP: &str = "intercept";

/// Try to rename `id` to the sentinel where its flag is false, then read it back
///
/// The read-back happens whether or not the update matched. No retry.
///
/// # Errors
///
/// Returns the store's error if the update or the read-back fails
/// (`ExErrorKind::Store`, or `ExErrorKind::NotFound` for an unknown id).
pub fn intercept(
    session: &mut dyn RowSession,
    id: RowId,
    name: &TaskName,
) -> Result<InterceptOutcome> {
    let with_context = |e: ExError| e.with_task(name.as_str()).with_row_id(id.get());

    log_task!(name, OP, EVENT_START_INTERCEPT, "start intercept");
    let rows_affected = session
        .update_name_if_unflagged(id, SENTINEL_NAME)
        .map_err(with_context)?;
    log_task!(
        name,
        OP,
        EVENT_UPDATED,
        { rows_affected = rows_affected },
        "updated, {} rows affected",
        rows_affected
    );

    log_task!(name, OP, EVENT_QUERYING, "querying data");
    let row = session.fetch_row(id).map_err(with_context)?;
    log_task!(
        name,
        OP,
        EVENT_COMPLETED,
        "completed. name={} and is_set={}",
        row.name,
        row.flag
    );

    Ok(InterceptOutcome { rows_affected, row })
}
