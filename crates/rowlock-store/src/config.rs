//! Connection settings
//!
//! Read from `DB_*` environment variables, with a `.env` file in the
//! working directory loaded first when present. Variables already set in
//! the environment win over `.env`.
//!
//! PostgreSQL is the default backend: its row-level locks are what the
//! experiment demonstrates. SQLite has to be selected with
//! `DB_BACKEND=sqlite`.

#![allow(clippy::result_large_err)]

use crate::errors::Result;
use rowlock_core::errors::RowLockError;
use rowlock_core_types::Sensitive;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[cfg(feature = "postgres")]
use sqlx::postgres::PgConnectOptions;

pub const ENV_BACKEND: &str = "DB_BACKEND";
pub const ENV_USER: &str = "DB_USER";
pub const ENV_PASS: &str = "DB_PASS";
pub const ENV_HOST: &str = "DB_HOST";
pub const ENV_NAME: &str = "DB_NAME";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PG_NAME: &str = "rowlock";
pub const DEFAULT_SQLITE_NAME: &str = "rowlock.db";

/// Which row store to run the experiment against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Postgres,
    /// Whole-database write lock; explicit fallback only
    Sqlite,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Postgres => "postgres",
            Backend::Sqlite => "sqlite",
        }
    }

    pub fn default_name(self) -> &'static str {
        match self {
            Backend::Postgres => DEFAULT_PG_NAME,
            Backend::Sqlite => DEFAULT_SQLITE_NAME,
        }
    }

    /// False when one open write transaction blocks writers on every row
    pub fn row_level_locking(self) -> bool {
        matches!(self, Backend::Postgres)
    }
}

impl FromStr for Backend {
    type Err = rowlock_core::ExError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Backend::Postgres),
            "sqlite" | "sqlite3" => Ok(Backend::Sqlite),
            other => Err(RowLockError::UnsupportedBackend {
                backend: other.to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load `.env` from the working directory if there is one
///
/// Returns the file's path so the caller can log it once logging is up.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// Settings for one experiment run
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: Backend,
    pub user: Option<String>,
    pub password: Sensitive<String>,
    /// `host` or `host:port`
    pub host: String,
    /// Database name (postgres) or database file path (sqlite)
    pub name: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            user: None,
            password: Sensitive::default(),
            host: DEFAULT_HOST.to_string(),
            name: Backend::default().default_name().to_string(),
        }
    }
}

impl StoreConfig {
    /// Load `.env` (if any) and read the process environment
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::Configuration` for an unknown backend or a
    /// postgres backend without `DB_USER`.
    pub fn from_env() -> Result<Self> {
        load_dotenv();
        Self::from_process_env()
    }

    /// Read the process environment without touching `.env`
    ///
    /// # Errors
    ///
    /// Same as [`StoreConfig::from_env`].
    pub fn from_process_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; empty values count as unset
    ///
    /// # Errors
    ///
    /// Same as [`StoreConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get(ENV_BACKEND) {
            Some(raw) => raw.parse::<Backend>()?,
            None => Backend::default(),
        };

        let config = Self {
            backend,
            user: get(ENV_USER),
            password: Sensitive::new(lookup(ENV_PASS).unwrap_or_default()),
            host: get(ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            name: get(ENV_NAME).unwrap_or_else(|| backend.default_name().to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Settings for a SQLite file
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            backend: Backend::Sqlite,
            name: path.into(),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns `ExErrorKind::Configuration` if postgres is selected without a user.
    pub fn validate(&self) -> Result<()> {
        if self.backend == Backend::Postgres && self.user.is_none() {
            return Err(RowLockError::MissingSetting {
                key: ENV_USER.to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn sqlite_path(&self) -> PathBuf {
        PathBuf::from(&self.name)
    }

    /// Split `DB_HOST` into host and optional port
    ///
    /// `[::1]:5433` style IPv6 literals keep their address without brackets.
    pub fn host_and_port(&self) -> (&str, Option<u16>) {
        let host = self.host.trim();
        if let Some((addr, port)) = host.rsplit_once(':') {
            let bracketed = addr.starts_with('[') && addr.ends_with(']');
            if let (Ok(port), true) = (port.parse::<u16>(), bracketed || !addr.contains(':')) {
                return (addr.trim_start_matches('[').trim_end_matches(']'), Some(port));
            }
        }
        (host, None)
    }

    /// Connection options built field by field, so credentials need no escaping
    ///
    /// # Errors
    ///
    /// Returns `ExErrorKind::Configuration` if `DB_USER` is unset.
    #[cfg(feature = "postgres")]
    pub fn pg_connect_options(&self) -> Result<Sensitive<PgConnectOptions>> {
        let user = self.user.as_deref().ok_or_else(|| {
            rowlock_core::ExError::from(RowLockError::MissingSetting {
                key: ENV_USER.to_string(),
            })
        })?;
        let (host, port) = self.host_and_port();

        let mut options = PgConnectOptions::new()
            .host(host)
            .username(user)
            .database(&self.name);
        if let Some(port) = port {
            options = options.port(port);
        }
        if !self.password.expose().is_empty() {
            options = options.password(self.password.expose());
        }
        Ok(Sensitive::new(options))
    }
}

impl fmt::Display for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.backend {
            Backend::Sqlite => write!(f, "sqlite:{}", self.name),
            Backend::Postgres => write!(
                f,
                "postgres://{}@{}/{}",
                self.user.as_deref().unwrap_or(""),
                self.host,
                self.name
            ),
        }
    }
}
