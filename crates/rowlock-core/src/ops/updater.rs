//! Transactional updater
//!
//! Sets a row's flag inside a transaction and keeps the transaction open for
//! the hold delay before committing. While it sleeps, the store holds the
//! write lock on the row; that is the window the interceptors race into.

#![allow(clippy::result_large_err)]

use std::thread;
use std::time::Duration;

use crate::core_types::schema::{
    EVENT_AFTER_SLEEP, EVENT_BEFORE_SLEEP, EVENT_COMMITTED, EVENT_ROLLED_BACK, EVENT_START_UPDATE,
};
use crate::errors::{ExError, Result};
use crate::log_task;
use crate::model::{RowId, TaskName};
use crate::store::RowSession;

const OP: &str = "tx_update";

/// Set the flag on `id` in a transaction held open for `hold`, then commit
///
/// Exactly one of commit or rollback ends every transaction this opens. The
/// sleep is a blocking sleep and always sits between the update and the
/// commit.
///
/// # Errors
///
/// - `ExErrorKind::Transaction` if begin or commit fails
/// - the update's `ExErrorKind::Store` error if the update fails and the
///   rollback succeeds
/// - `ExErrorKind::Transaction` wrapping the update error if the rollback
///   fails too
pub fn update(
    session: &mut dyn RowSession,
    id: RowId,
    name: &TaskName,
    hold: Duration,
) -> Result<()> {
    let with_context = |e: ExError| e.with_task(name.as_str()).with_row_id(id.get());

    let mut tx = session.begin().map_err(with_context)?;
    log_task!(name, OP, EVENT_START_UPDATE, "start update");

    let rows = match tx.set_flag(id) {
        Ok(rows) => rows,
        Err(err) => {
            let err = with_context(err);
            return match tx.rollback() {
                Ok(()) => {
                    log_task!(name, OP, EVENT_ROLLED_BACK, "rolled back");
                    Err(err)
                }
                Err(rollback_err) => Err(with_context(ExError::rollback_failed(
                    err,
                    rollback_err,
                ))),
            };
        }
    };

    log_task!(name, OP, EVENT_BEFORE_SLEEP, { rows_affected = rows }, "before sleep");
    thread::sleep(hold);
    log_task!(name, OP, EVENT_AFTER_SLEEP, "after sleep");

    tx.commit().map_err(with_context)?;
    log_task!(name, OP, EVENT_COMMITTED, "committed");
    Ok(())
}
