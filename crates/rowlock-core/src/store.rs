//! Row-store contract
//!
//! The experiment never talks to a driver directly. It needs a handle that
//! can execute statements, read one row back, and begin/commit/roll back a
//! transaction; backends in `rowlock-store` provide it. Locking is entirely
//! the backend's business: nothing here takes an in-process lock.

#![allow(clippy::result_large_err)]

use crate::errors::Result;
use crate::model::{RowId, RowState};

/// Shared handle to the external row store
///
/// One handle is shared by every task of a run; each task opens its own
/// session so statements from different tasks run on different connections.
pub trait RowStore: Send + Sync {
    /// Open a new session (connection) to the store
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::Store` if the connection cannot be opened.
    fn connect(&self) -> Result<Box<dyn RowSession>>;

    /// Short backend label for logs (`sqlite`, `postgres`)
    fn backend(&self) -> &'static str;

    /// Whether a transaction's write locks only the rows it touched
    ///
    /// Stores that lock the whole database return `false`: the second
    /// row's interceptor then waits for the updater too.
    fn row_level_locking(&self) -> bool {
        true
    }
}

/// One connection to the row store, used outside any explicit transaction
pub trait RowSession: Send {
    /// Insert a row with the given name and a false flag
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::Store` if the insert fails or the generated
    /// identifier cannot be read back.
    fn insert_row(&mut self, name: &str) -> Result<RowId>;

    /// `UPDATE ... SET name = ? WHERE id = ? AND is_set = false`
    ///
    /// Returns the number of rows affected (0 or 1).
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::Store` if the statement fails.
    fn update_name_if_unflagged(&mut self, id: RowId, name: &str) -> Result<u64>;

    /// Read a row's name and flag
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::NotFound` when no row has this id and
    /// `ExErrorKind::Store` when the query or scan fails.
    fn fetch_row(&mut self, id: RowId) -> Result<RowState>;

    /// Begin a transaction on this session
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::Transaction` if the transaction cannot start.
    fn begin(&mut self) -> Result<Box<dyn RowTransaction + '_>>;
}

/// An open transaction
///
/// Dropping a transaction without calling `commit` or `rollback` rolls it
/// back.
pub trait RowTransaction {
    /// `UPDATE ... SET is_set = true WHERE id = ?` inside the transaction
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::Store` if the statement fails.
    fn set_flag(&mut self, id: RowId) -> Result<u64>;

    /// # Errors
    ///
    /// Returns `ExErrorKind::Transaction` if the commit fails.
    fn commit(self: Box<Self>) -> Result<()>;

    /// # Errors
    ///
    /// Returns `ExErrorKind::Transaction` if the rollback fails.
    fn rollback(self: Box<Self>) -> Result<()>;
}
