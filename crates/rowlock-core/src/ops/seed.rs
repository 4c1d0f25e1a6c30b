//! Seed loader

#![allow(clippy::result_large_err)]

use crate::core_types::schema::EVENT_INSERTED;
use crate::errors::Result;
use crate::log_task;
use crate::model::{RowId, TaskName};
use crate::store::RowSession;

/// Insert one row named after `name` and return its store-assigned id
///
/// # Errors
///
/// Returns `ExErrorKind::Store` if the insert cannot be executed or the
/// identifier cannot be retrieved.
pub fn insert(session: &mut dyn RowSession, name: &TaskName) -> Result<RowId> {
    let id = session
        .insert_row(name.as_str())
        .map_err(|e| e.with_task(name.as_str()))?;

    log_task!(name, "insert", EVENT_INSERTED, { row_id = id.get() }, "inserted row {}", id);
    Ok(id)
}
