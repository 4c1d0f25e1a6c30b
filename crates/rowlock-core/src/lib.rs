//! RowLock Core - the transaction-interception experiment
//!
//! This crate holds everything that does not depend on a particular
//! database driver:
//! - Row model and experiment timing
//! - The row-store contract (`RowStore` / `RowSession` / `RowTransaction`)
//! - Seed loader, transactional updater and interceptor operations
//! - The experiment orchestrator that races them
//! - Canonical error and logging facilities
//!
//! Backends live in `rowlock-store`.

pub mod errors;
pub mod experiment;
pub mod logging_facility;
pub mod model;
pub mod ops;
pub mod store;

pub use rowlock_core_types as core_types;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, Result, RowLockError};
pub use experiment::{run, ExperimentReport, ExperimentTiming, TaskTimings};
pub use model::{InterceptOutcome, RowId, RowState, TaskName, SENTINEL_NAME};
pub use store::{RowSession, RowStore, RowTransaction};
