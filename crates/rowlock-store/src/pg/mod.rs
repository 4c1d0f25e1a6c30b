//! PostgreSQL row store
//!
//! Row-level locks come from the server: under READ COMMITTED the updater's
//! `UPDATE ... SET is_set = TRUE` locks only its row, the conditional update
//! on that row waits for the commit and then re-checks `is_set`, and the
//! other row is never blocked.
//!
//! The experiment tasks are plain threads, so each call drives its future
//! to completion on a runtime owned by the store.

#![allow(clippy::result_large_err)]

use crate::errors::{from_sqlx, io_error, tx_from_sqlx, Result};
use rowlock_core::errors::{ExError, ExErrorKind, RowLockError};
use rowlock_core::{log_op_end, log_op_start};
use rowlock_core::{RowId, RowSession, RowState, RowStore, RowTransaction};
use rowlock_core_types::Sensitive;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Connection, Postgres, Transaction};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Runtime;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS lock_rows (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL DEFAULT '',
    is_set BOOLEAN NOT NULL DEFAULT FALSE
)";

/// Enough for the three experiment tasks plus setup
const MAX_CONNECTIONS: u32 = 4;

pub struct PgRowStore {
    pool: PgPool,
    runtime: Arc<Runtime>,
}

impl PgRowStore {
    /// Connect a pool with options built by `StoreConfig::pg_connect_options`
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::Io` if the runtime cannot start and
    /// `ExErrorKind::Store` if the server is unreachable.
    pub fn open(options: &Sensitive<PgConnectOptions>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("rowlock-pg")
            .enable_all()
            .build()
            .map_err(|e| io_error("runtime", e))?;

        let pool = runtime
            .block_on(
                PgPoolOptions::new()
                    .max_connections(MAX_CONNECTIONS)
                    .connect_with(options.expose().clone()),
            )
            .map_err(|e| from_sqlx("connect", e))?;

        Ok(Self {
            pool,
            runtime: Arc::new(runtime),
        })
    }

    /// Create the table if missing, then empty it and restart the id sequence
    pub fn setup(&self) -> Result<()> {
        let started = Instant::now();
        log_op_start!("setup", backend = "postgres");

        self.runtime.block_on(async {
            sqlx::query(CREATE_TABLE)
                .execute(&self.pool)
                .await
                .map_err(|e| from_sqlx("create_table", e))?;
            sqlx::query("TRUNCATE lock_rows RESTART IDENTITY")
                .execute(&self.pool)
                .await
                .map_err(|e| from_sqlx("reset_rows", e))?;
            Ok::<_, ExError>(())
        })?;

        let duration_ms = started.elapsed().as_millis() as u64;
        log_op_end!("setup", duration_ms = duration_ms);
        Ok(())
    }
}

impl RowStore for PgRowStore {
    fn connect(&self) -> Result<Box<dyn RowSession>> {
        let conn = self
            .runtime
            .block_on(self.pool.acquire())
            .map_err(|e| from_sqlx("connect", e))?;
        Ok(Box::new(PgSession {
            conn: Some(conn),
            runtime: Arc::clone(&self.runtime),
        }))
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

impl Drop for PgRowStore {
    fn drop(&mut self) {
        self.runtime.block_on(self.pool.close());
    }
}

/// One pooled connection
pub struct PgSession {
    conn: Option<PoolConnection<Postgres>>,
    runtime: Arc<Runtime>,
}

fn released(op: &str) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op(op)
        .with_message("session connection already released")
}

impl RowSession for PgSession {
    fn insert_row(&mut self, name: &str) -> Result<RowId> {
        let conn = self.conn.as_deref_mut().ok_or_else(|| released("insert_row"))?;
        let id: i64 = self
            .runtime
            .block_on(
                sqlx::query_scalar("INSERT INTO lock_rows (name) VALUES ($1) RETURNING id")
                    .bind(name)
                    .fetch_one(conn),
            )
            .map_err(|e| from_sqlx("insert_row", e))?;
        Ok(RowId::new(id))
    }

    fn update_name_if_unflagged(&mut self, id: RowId, name: &str) -> Result<u64> {
        let conn = self
            .conn
            .as_deref_mut()
            .ok_or_else(|| released("update_name_if_unflagged"))?;
        let result = self
            .runtime
            .block_on(
                sqlx::query("UPDATE lock_rows SET name = $1 WHERE id = $2 AND is_set = FALSE")
                    .bind(name)
                    .bind(id.get())
                    .execute(conn),
            )
            .map_err(|e| from_sqlx("update_name_if_unflagged", e))?;
        Ok(result.rows_affected())
    }

    fn fetch_row(&mut self, id: RowId) -> Result<RowState> {
        let conn = self.conn.as_deref_mut().ok_or_else(|| released("fetch_row"))?;
        let row: Option<(String, bool)> = self
            .runtime
            .block_on(
                sqlx::query_as("SELECT name, is_set FROM lock_rows WHERE id = $1")
                    .bind(id.get())
                    .fetch_optional(conn),
            )
            .map_err(|e| from_sqlx("fetch_row", e))?;

        row.map(|(name, flag)| RowState::new(name, flag))
            .ok_or_else(|| RowLockError::RowNotFound { row_id: id.get() }.into())
    }

    fn begin(&mut self) -> Result<Box<dyn RowTransaction + '_>> {
        let conn = self.conn.as_deref_mut().ok_or_else(|| released("begin"))?;
        let tx = self
            .runtime
            .block_on(conn.begin())
            .map_err(|e| tx_from_sqlx("begin", e))?;
        Ok(Box::new(PgTransaction {
            tx,
            runtime: &self.runtime,
        }))
    }
}

impl Drop for PgSession {
    fn drop(&mut self) {
        // Returning a connection to the pool spawns onto the runtime
        let _guard = self.runtime.enter();
        drop(self.conn.take());
    }
}

/// An open PostgreSQL transaction; dropping it queues a rollback
pub struct PgTransaction<'c> {
    tx: Transaction<'c, Postgres>,
    runtime: &'c Runtime,
}

impl RowTransaction for PgTransaction<'_> {
    fn set_flag(&mut self, id: RowId) -> Result<u64> {
        let result = self
            .runtime
            .block_on(
                sqlx::query("UPDATE lock_rows SET is_set = TRUE WHERE id = $1")
                    .bind(id.get())
                    .execute(&mut *self.tx),
            )
            .map_err(|e| from_sqlx("set_flag", e))?;
        Ok(result.rows_affected())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let PgTransaction { tx, runtime } = *self;
        runtime
            .block_on(tx.commit())
            .map_err(|e| tx_from_sqlx("commit", e))
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        let PgTransaction { tx, runtime } = *self;
        runtime
            .block_on(tx.rollback())
            .map_err(|e| tx_from_sqlx("rollback", e))
    }
}
