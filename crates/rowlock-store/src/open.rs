//! Backend selection

#![allow(clippy::result_large_err)]

use crate::config::{Backend, StoreConfig};
use crate::errors::{io_error, Result};
use crate::repo::SqliteRowStore;
use rowlock_core::RowStore;

/// Open the configured store and prepare it for a run
///
/// The table is created if missing and emptied before returning.
///
/// # Errors
///
/// Returns `ExErrorKind::Configuration` if the backend is unavailable in
/// this build, `ExErrorKind::Io` if the SQLite file's directory cannot be
/// created, and `ExErrorKind::Store` if connecting or setup fails.
pub fn open_store(config: &StoreConfig) -> Result<Box<dyn RowStore>> {
    tracing::info!(backend = %config.backend, store = %config, "opening row store");

    match config.backend {
        Backend::Sqlite => {
            let path = config.sqlite_path();
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| io_error("create_dir", e))?;
            }
            let store = SqliteRowStore::new(path);
            store.setup()?;
            Ok(Box::new(store))
        }
        Backend::Postgres => open_postgres(config),
    }
}

#[cfg(feature = "postgres")]
fn open_postgres(config: &StoreConfig) -> Result<Box<dyn RowStore>> {
    let store = crate::pg::PgRowStore::open(&config.pg_connect_options()?)?;
    store.setup()?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "postgres"))]
fn open_postgres(_config: &StoreConfig) -> Result<Box<dyn RowStore>> {
    Err(crate::errors::config_error(
        crate::config::ENV_BACKEND,
        "postgres support is not compiled in (build with the `postgres` feature)",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_sqlite_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rows.db");
        let config = StoreConfig::sqlite(path.to_string_lossy());

        let store = open_store(&config).unwrap();

        assert_eq!(store.backend(), "sqlite");
        assert!(path.exists());
    }

    #[cfg(not(feature = "postgres"))]
    #[test]
    fn test_postgres_without_feature_is_configuration_error() {
        let config = StoreConfig {
            backend: Backend::Postgres,
            user: Some("root".to_string()),
            ..StoreConfig::default()
        };

        let err = open_store(&config).err().unwrap();
        assert_eq!(err.kind(), rowlock_core::ExErrorKind::Configuration);
    }
}
