//! Migration framework
//!
//! Provides:
//! - Migration runner with checksums
//! - Idempotent application
//! - Embedded SQL migrations
//! - The per-run table reset

mod checksums;
mod embedded;
mod runner;

pub use runner::{apply_migrations, reset_rows};
