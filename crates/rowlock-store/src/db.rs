//! Database connection management
//!
//! Opens SQLite connections configured for the experiment: WAL journaling
//! and a busy timeout long enough to outlast the updater's hold, so a
//! contending writer waits for the commit instead of failing with
//! `SQLITE_BUSY`.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(|e| from_rusqlite("open", e))
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(|e| from_rusqlite("open", e))
}

/// Configure a connection for concurrent use by the experiment tasks
pub fn configure(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    conn.busy_timeout(busy_timeout)
        .map_err(|e| from_rusqlite("busy_timeout", e))?;

    // journal_mode reports the resulting mode as a row
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(|e| from_rusqlite("journal_mode", e))?;
    tracing::debug!(journal_mode = %mode, "configured sqlite connection");

    Ok(())
}

/// Open and configure in one step
pub fn open_configured<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Connection> {
    let conn = open(path)?;
    configure(&conn, busy_timeout)?;
    Ok(conn)
}
