//! Repository layer
//!
//! Implements the core row-store contract on SQLite

pub mod sqlite_repo;

pub use sqlite_repo::{SqliteRowStore, SqliteSession, SqliteTransaction};
