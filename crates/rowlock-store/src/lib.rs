//! RowLock Store - backends for the row-store contract
//!
//! Provides:
//! - `SqliteRowStore`, a file-backed SQLite store (one connection per session)
//! - Checksummed schema migrations and the per-run table reset
//! - Environment configuration (`DB_*` variables, `.env`)
//! - `PgRowStore` behind the `postgres` feature

pub mod config;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod open;
#[cfg(feature = "postgres")]
pub mod pg;
pub mod repo;

// Re-export key types
pub use config::{Backend, StoreConfig};
pub use errors::Result;
pub use open::open_store;
#[cfg(feature = "postgres")]
pub use pg::PgRowStore;
pub use repo::SqliteRowStore;
