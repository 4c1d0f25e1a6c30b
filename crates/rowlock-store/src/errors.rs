//! Error handling for rowlock-store
//!
//! Maps driver errors onto the core `ExError` taxonomy

use rowlock_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Store)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Store)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: recorded {}, embedded {}",
            migration_id, expected, actual
        ))
}

/// Create a statement error from rusqlite::Error
///
/// Lock timeouts (`SQLITE_BUSY` / `SQLITE_LOCKED`) are classified as
/// `Concurrency`; everything else is a `Store` failure.
pub fn from_rusqlite(op: &str, err: rusqlite::Error) -> ExError {
    let kind = match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ) =>
        {
            ExErrorKind::Concurrency
        }
        _ => ExErrorKind::Store,
    };
    ExError::new(kind).with_op(op).with_message(err.to_string())
}

/// Create a transaction-control error (begin/commit/rollback) from rusqlite::Error
pub fn tx_from_rusqlite(op: &str, err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Transaction)
        .with_op(op)
        .with_message(err.to_string())
}

/// Create a statement error from sqlx::Error
#[cfg(feature = "postgres")]
pub fn from_sqlx(op: &str, err: sqlx::Error) -> ExError {
    let kind = match &err {
        sqlx::Error::RowNotFound => ExErrorKind::NotFound,
        sqlx::Error::PoolTimedOut => ExErrorKind::Concurrency,
        _ => ExErrorKind::Store,
    };
    ExError::new(kind).with_op(op).with_message(err.to_string())
}

/// Create a transaction-control error from sqlx::Error
#[cfg(feature = "postgres")]
pub fn tx_from_sqlx(op: &str, err: sqlx::Error) -> ExError {
    ExError::new(ExErrorKind::Transaction)
        .with_op(op)
        .with_message(err.to_string())
}

/// Create a configuration error
pub fn config_error(key: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Configuration)
        .with_op("load_config")
        .with_message(format!("{}: {}", key, reason))
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
