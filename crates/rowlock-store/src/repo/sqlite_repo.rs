//! SQLite row store
//!
//! Every session is its own connection to the same database file. SQLite
//! locks writers per database rather than per row: while the updater's
//! transaction is open, every other writer waits in the busy handler, and
//! its conditional predicate is evaluated against the committed state once
//! the lock is released. The final row states match a row-locking store,
//! but the free row's interceptor waits out the hold as well, so this
//! backend is only used when selected explicitly.

#![allow(clippy::result_large_err)]

use crate::db;
use crate::errors::{from_rusqlite, tx_from_rusqlite, Result};
use crate::migrations;
use rowlock_core::errors::{ExError, ExErrorKind, RowLockError};
use rowlock_core::{log_op_end, log_op_start};
use rowlock_core::{RowId, RowSession, RowState, RowStore, RowTransaction};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// File-backed SQLite implementation of `RowStore`
#[derive(Debug, Clone)]
pub struct SqliteRowStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteRowStore {
    /// Longer than any sensible hold delay
    pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Self::DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Override how long a blocked statement waits for the lock holder
    ///
    /// Must exceed the experiment's hold delay, or the contending
    /// interceptor fails with a `Concurrency` error instead of waiting.
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    /// Ensure the table exists and is empty
    ///
    /// Applies pending migrations, then deletes every row.
    pub fn setup(&self) -> Result<()> {
        let started = Instant::now();
        log_op_start!("setup", backend = "sqlite", path = %self.path.display());

        let mut conn = db::open_configured(&self.path, self.busy_timeout)?;
        migrations::apply_migrations(&mut conn)?;
        let rows_removed = migrations::reset_rows(&conn)? as u64;

        let duration_ms = started.elapsed().as_millis() as u64;
        log_op_end!("setup", duration_ms = duration_ms, rows_removed);
        Ok(())
    }

    /// Open a session with its concrete type (tests use this for direct access)
    pub fn open_session(&self) -> Result<SqliteSession> {
        let conn = db::open_configured(&self.path, self.busy_timeout)?;
        Ok(SqliteSession { conn })
    }
}

impl RowStore for SqliteRowStore {
    fn connect(&self) -> Result<Box<dyn RowSession>> {
        Ok(Box::new(self.open_session()?))
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn row_level_locking(&self) -> bool {
        false
    }
}

/// One SQLite connection
pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl RowSession for SqliteSession {
    fn insert_row(&mut self, name: &str) -> Result<RowId> {
        let inserted = self
            .conn
            .execute("INSERT INTO lock_rows (name) VALUES (?1)", [name])
            .map_err(|e| from_rusqlite("insert_row", e))?;

        let id = self.conn.last_insert_rowid();
        if inserted != 1 || id <= 0 {
            return Err(ExError::new(ExErrorKind::Store)
                .with_op("insert_row")
                .with_message(format!("no row id returned for '{}'", name)));
        }
        Ok(RowId::new(id))
    }

    fn update_name_if_unflagged(&mut self, id: RowId, name: &str) -> Result<u64> {
        let rows = self
            .conn
            .execute(
                "UPDATE lock_rows SET name = ?1 WHERE id = ?2 AND is_set = 0",
                rusqlite::params![name, id.get()],
            )
            .map_err(|e| from_rusqlite("update_name_if_unflagged", e))?;
        Ok(rows as u64)
    }

    fn fetch_row(&mut self, id: RowId) -> Result<RowState> {
        self.conn
            .query_row(
                "SELECT name, is_set FROM lock_rows WHERE id = ?1",
                [id.get()],
                |row| Ok(RowState::new(row.get::<_, String>(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| from_rusqlite("fetch_row", e))?
            .ok_or_else(|| RowLockError::RowNotFound { row_id: id.get() }.into())
    }

    fn begin(&mut self) -> Result<Box<dyn RowTransaction + '_>> {
        // IMMEDIATE takes the write lock at BEGIN rather than at the first write
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| tx_from_rusqlite("begin", e))?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

/// An open SQLite transaction; rolled back on drop
pub struct SqliteTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl RowTransaction for SqliteTransaction<'_> {
    fn set_flag(&mut self, id: RowId) -> Result<u64> {
        let rows = self
            .tx
            .execute("UPDATE lock_rows SET is_set = 1 WHERE id = ?1", [id.get()])
            .map_err(|e| from_rusqlite("set_flag", e))?;
        Ok(rows as u64)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().map_err(|e| tx_from_rusqlite("commit", e))
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.tx
            .rollback()
            .map_err(|e| tx_from_rusqlite("rollback", e))
    }
}
