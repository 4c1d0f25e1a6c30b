//! Experiment orchestrator
//!
//! Fixed topology: one transactional updater on the first row, and one
//! interceptor on each row started after a delay shorter than the
//! updater's hold. Three OS threads, joined at the end; the store's row
//! locking is the only coordination between them.

#![allow(clippy::result_large_err)]

use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};

use crate::core_types::schema::{EVENT_NO_ROW_LOCKS, EVENT_TERMINATING};
use crate::core_types::RunId;
use crate::errors::{Result, RowLockError};
use crate::model::{InterceptOutcome, RowId, TaskName};
use crate::ops;
use crate::store::{RowSession, RowStore};
use crate::{log_op_error, log_op_start};

const OP: &str = "experiment";

/// Delays that decide the race
///
/// The intercept delay must be shorter than the hold so both interceptors
/// fire while the updater's transaction is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExperimentTiming {
    hold: Duration,
    intercept_delay: Duration,
}

impl ExperimentTiming {
    pub const DEFAULT_HOLD: Duration = Duration::from_secs(5);
    pub const DEFAULT_INTERCEPT_DELAY: Duration = Duration::from_secs(1);

    /// # Errors
    ///
    /// Returns `ExErrorKind::InvalidInput` unless `intercept_delay < hold`.
    pub fn new(hold: Duration, intercept_delay: Duration) -> Result<Self> {
        if intercept_delay >= hold {
            return Err(RowLockError::InvalidTiming {
                intercept_delay_ms: intercept_delay.as_millis(),
                hold_ms: hold.as_millis(),
            }
            .into());
        }
        Ok(Self {
            hold,
            intercept_delay,
        })
    }

    /// How long the updater keeps its transaction open
    pub fn hold(&self) -> Duration {
        self.hold
    }

    /// How long each interceptor waits before its update
    pub fn intercept_delay(&self) -> Duration {
        self.intercept_delay
    }
}

impl Default for ExperimentTiming {
    fn default() -> Self {
        Self {
            hold: Self::DEFAULT_HOLD,
            intercept_delay: Self::DEFAULT_INTERCEPT_DELAY,
        }
    }
}

/// When each task finished, measured from the moment the three were launched
///
/// With row-level locking the second interceptor finishes inside the hold
/// and the first one only after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskTimings {
    pub update: Duration,
    pub first_intercept: Duration,
    pub second_intercept: Duration,
}

/// What every task of one run produced
#[derive(Debug)]
pub struct ExperimentReport {
    pub run_id: RunId,
    pub first: TaskName,
    pub second: TaskName,
    /// `RowId::MISSING` if seeding failed
    pub first_id: RowId,
    pub second_id: RowId,
    pub update: Result<()>,
    pub first_intercept: Result<InterceptOutcome>,
    pub second_intercept: Result<InterceptOutcome>,
    pub timings: TaskTimings,
}

impl ExperimentReport {
    /// True when both rows were seeded and every task succeeded
    pub fn is_clean(&self) -> bool {
        !self.first_id.is_missing()
            && !self.second_id.is_missing()
            && self.update.is_ok()
            && self.first_intercept.is_ok()
            && self.second_intercept.is_ok()
    }
}

/// Run the experiment with the rows `john` and `jane`
pub fn run(store: &dyn RowStore, timing: &ExperimentTiming) -> ExperimentReport {
    let (first, second) = default_names();
    run_with_names(store, first, second, timing)
}

/// Run the experiment with caller-chosen row names
///
/// Seeding failures are logged and the run continues with
/// `RowId::MISSING` in place of the lost id. Task failures are logged and
/// returned in the report; they never stop sibling tasks. The final
/// `terminating` line is always emitted.
pub fn run_with_names(
    store: &dyn RowStore,
    first: TaskName,
    second: TaskName,
    timing: &ExperimentTiming,
) -> ExperimentReport {
    let run_id = RunId::new();
    let span = tracing::info_span!("experiment", run_id = %run_id, backend = store.backend());
    let _entered = span.enter();
    let started = Instant::now();
    log_op_start!(OP, backend = store.backend());
    if !store.row_level_locking() {
        tracing::warn!(
            component = module_path!(),
            op = OP,
            event = EVENT_NO_ROW_LOCKS,
            backend = store.backend(),
            "{} locks the whole database: {} stays blocked until {} commits",
            store.backend(),
            second,
            first
        );
    }

    let (first_id, second_id) = seed_rows(store, &first, &second);

    let launched = Instant::now();
    let ((update, update_at), (first_intercept, first_at), (second_intercept, second_at)) =
        thread::scope(|scope| {
            let updater = scope.spawn(|| {
                span.in_scope(|| {
                    with_session(store, &first, |s| {
                        ops::update(s, first_id, &first, timing.hold())
                    })
                })
            });
            let first_interceptor = scope.spawn(|| {
                span.in_scope(|| {
                    with_session(store, &first, |s| {
                        thread::sleep(timing.intercept_delay());
                        ops::intercept(s, first_id, &first)
                    })
                })
            });
            let second_interceptor = scope.spawn(|| {
                span.in_scope(|| {
                    with_session(store, &second, |s| {
                        thread::sleep(timing.intercept_delay());
                        ops::intercept(s, second_id, &second)
                    })
                })
            });

            (
                join(updater, &first, "tx_update", launched),
                join(first_interceptor, &first, "intercept", launched),
                join(second_interceptor, &second, "intercept", launched),
            )
        });

    tracing::info!(
        component = module_path!(),
        op = OP,
        event = EVENT_TERMINATING,
        duration_ms = elapsed_ms(started),
        "terminating"
    );

    ExperimentReport {
        run_id,
        first,
        second,
        first_id,
        second_id,
        update,
        first_intercept,
        second_intercept,
        timings: TaskTimings {
            update: update_at,
            first_intercept: first_at,
            second_intercept: second_at,
        },
    }
}

fn default_names() -> (TaskName, TaskName) {
    (TaskName::known("john"), TaskName::known("jane"))
}

fn seed_rows(store: &dyn RowStore, first: &TaskName, second: &TaskName) -> (RowId, RowId) {
    let started = Instant::now();
    let mut session = match store.connect() {
        Ok(session) => session,
        Err(err) => {
            log_op_error!("insert", &err, duration_ms = elapsed_ms(started));
            return (RowId::MISSING, RowId::MISSING);
        }
    };

    let first_id = seed_one(session.as_mut(), first);
    let second_id = seed_one(session.as_mut(), second);
    (first_id, second_id)
}

fn seed_one(session: &mut dyn RowSession, name: &TaskName) -> RowId {
    let started = Instant::now();
    ops::insert(session, name).unwrap_or_else(|err| {
        log_op_error!("insert", &err, duration_ms = elapsed_ms(started), task = %name);
        RowId::MISSING
    })
}

/// Run `task` on a fresh session; also returns when it finished
fn with_session<T>(
    store: &dyn RowStore,
    name: &TaskName,
    task: impl FnOnce(&mut dyn RowSession) -> Result<T>,
) -> (Result<T>, Instant) {
    let result = store
        .connect()
        .map_err(|e| e.with_task(name.as_str()))
        .and_then(|mut session| task(session.as_mut()));
    (result, Instant::now())
}

fn join<T>(
    handle: ScopedJoinHandle<'_, (Result<T>, Instant)>,
    name: &TaskName,
    op: &str,
    launched: Instant,
) -> (Result<T>, Duration) {
    let (result, finished) = handle.join().unwrap_or_else(|_| {
        let panicked = RowLockError::TaskPanicked {
            task: name.to_string(),
        };
        (Err(panicked.into()), Instant::now())
    });
    if let Err(err) = &result {
        log_op_error!(op, err, duration_ms = elapsed_ms(launched), task = %name);
    }
    (result, finished.saturating_duration_since(launched))
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
