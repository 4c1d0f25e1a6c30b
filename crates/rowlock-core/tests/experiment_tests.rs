// Orchestrator over the fake store: task topology, failure isolation and
// the log lines each task emits.

mod common;

use common::{FakeStore, Faults};
use rowlock_core::core_types::schema::{EVENT_END_ERROR, EVENT_NO_ROW_LOCKS, EVENT_TERMINATING};
use rowlock_core::errors::{ExErrorKind, Result};
use rowlock_core::experiment::run_with_names;
use rowlock_core::logging_facility::test_capture::init_test_capture;
use rowlock_core::{ExperimentTiming, RowId, RowSession, RowStore, TaskName, SENTINEL_NAME};
use std::time::Duration;
use tracing::Level;

/// Same fake, reporting database-wide write locks
struct WholeDatabaseLocks(FakeStore);

impl RowStore for WholeDatabaseLocks {
    fn connect(&self) -> Result<Box<dyn RowSession>> {
        self.0.connect()
    }

    fn backend(&self) -> &'static str {
        "fake-db-lock"
    }

    fn row_level_locking(&self) -> bool {
        false
    }
}

fn fast_timing() -> ExperimentTiming {
    ExperimentTiming::new(Duration::from_millis(300), Duration::from_millis(50)).unwrap()
}

fn names(first: &str, second: &str) -> (TaskName, TaskName) {
    (TaskName::new(first).unwrap(), TaskName::new(second).unwrap())
}

#[test]
fn test_locked_row_keeps_updater_value_free_row_is_intercepted() {
    let store = FakeStore::new();
    let (first, second) = names("john", "jane");

    let report = run_with_names(&store, first, second, &fast_timing());

    assert!(report.is_clean(), "{:?}", report);
    assert_ne!(report.first_id, report.second_id);

    let first_outcome = report.first_intercept.as_ref().unwrap();
    assert_eq!(first_outcome.rows_affected, 0);
    assert_eq!(first_outcome.row.name, "john");
    assert!(first_outcome.row.flag);

    let second_outcome = report.second_intercept.as_ref().unwrap();
    assert_eq!(second_outcome.rows_affected, 1);
    assert_eq!(second_outcome.row.name, SENTINEL_NAME);
    assert!(!second_outcome.row.flag);

    let john = store.row(report.first_id).unwrap();
    assert_eq!((john.name.as_str(), john.flag), ("john", true));
    let jane = store.row(report.second_id).unwrap();
    assert_eq!((jane.name.as_str(), jane.flag), (SENTINEL_NAME, false));
    assert_eq!(store.state().commits, 1);
}

#[test]
fn test_failed_insert_does_not_abort_the_run() {
    // Given: the second row cannot be inserted
    let store = FakeStore::with_faults(Faults {
        fail_insert_for: Some("bea".to_string()),
        ..Faults::default()
    });
    let (first, second) = names("abe", "bea");

    // When
    let report = run_with_names(&store, first, second, &fast_timing());

    // Then: the run continued with a placeholder id for the lost row
    assert!(!report.is_clean());
    assert!(!report.first_id.is_missing());
    assert_eq!(report.second_id, RowId::MISSING);

    // And: the first row's tasks were unaffected
    assert!(report.update.is_ok());
    assert_eq!(report.first_intercept.as_ref().unwrap().rows_affected, 0);

    // And: the second interceptor reported the missing row
    let err = report.second_intercept.as_ref().unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_unreachable_store_still_terminates() {
    let capture = init_test_capture();
    let store = FakeStore::with_faults(Faults {
        fail_connect: true,
        ..Faults::default()
    });
    let (first, second) = names("cal", "dee");

    let report = run_with_names(&store, first, second, &fast_timing());

    assert!(report.first_id.is_missing());
    assert!(report.second_id.is_missing());
    assert_eq!(report.update.as_ref().unwrap_err().kind(), ExErrorKind::Store);
    assert!(report.first_intercept.is_err());
    assert!(report.second_intercept.is_err());

    let run = capture.run_events(&report.run_id.to_string());
    let task_errors = run
        .iter()
        .filter(|e| e.event() == Some(EVENT_END_ERROR) && e.task().is_some())
        .count();
    assert_eq!(task_errors, 3, "one error line per task");
    assert_eq!(run.last().and_then(|e| e.event()), Some(EVENT_TERMINATING));
}

#[test]
fn test_task_log_lines() {
    let capture = init_test_capture();
    let store = FakeStore::new();
    let (first, second) = names("kate", "lena");

    let report = run_with_names(&store, first, second, &fast_timing());

    let kate = capture.task_messages("kate");
    for expected in [
        "[kate]: inserted row 1",
        "[kate]: start update",
        "[kate]: before sleep",
        "[kate]: after sleep",
        "[kate]: committed",
        "[kate]: start intercept",
        "[kate]: updated, 0 rows affected",
        "[kate]: querying data",
        "[kate]: completed. name=kate and is_set=true",
    ] {
        assert!(kate.iter().any(|m| m == expected), "missing {:?} in {:?}", expected, kate);
    }

    let lena = capture.task_messages("lena");
    assert!(lena.iter().any(|m| m == "[lena]: updated, 1 rows affected"));
    assert!(lena
        .iter()
        .any(|m| m == "[lena]: completed. name=something else and is_set=false"));

    // Every line of the run, task threads included, carries its run id;
    // the terminating line is the last one
    let run = capture.run_events(&report.run_id.to_string());
    assert!(run.iter().filter(|e| e.task() == Some("kate")).count() >= kate.len());
    let last = run.last().unwrap();
    assert_eq!(last.event(), Some(EVENT_TERMINATING));
    assert_eq!(last.message(), Some("terminating"));
}

#[test]
fn test_free_row_finishes_inside_the_hold_held_row_after_it() {
    // Given: a store with row-level locks and a hold well above the delay
    let store = FakeStore::row_locking();
    let hold = Duration::from_millis(600);
    let timing = ExperimentTiming::new(hold, Duration::from_millis(100)).unwrap();
    let (first, second) = names("ivan", "jill");

    // When
    let report = run_with_names(&store, first, second, &timing);

    // Then: the free row was renamed while the transaction was still open
    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(report.second_intercept.as_ref().unwrap().rows_affected, 1);
    assert!(
        report.timings.second_intercept < hold,
        "free row waited: {:?}",
        report.timings
    );

    // And: the held row's interceptor only got through after the commit
    assert_eq!(report.first_intercept.as_ref().unwrap().rows_affected, 0);
    assert!(report.timings.update >= hold);
    assert!(
        report.timings.first_intercept >= hold,
        "held row did not wait: {:?}",
        report.timings
    );
}

#[test]
fn test_store_without_row_locks_is_announced() {
    let capture = init_test_capture();
    let store = WholeDatabaseLocks(FakeStore::new());
    let (first, second) = names("owen", "pia");

    let report = run_with_names(&store, first, second, &fast_timing());

    let warnings: Vec<_> = capture
        .run_events(&report.run_id.to_string())
        .into_iter()
        .filter(|e| e.event() == Some(EVENT_NO_ROW_LOCKS))
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].level, Level::WARN);
    assert_eq!(warnings[0].field("backend"), Some("fake-db-lock"));
}

#[test]
fn test_row_locking_store_is_not_announced() {
    let capture = init_test_capture();
    let store = FakeStore::row_locking();
    let (first, second) = names("quin", "rhea");

    let report = run_with_names(&store, first, second, &fast_timing());

    let warnings = capture.count_events(|e| {
        e.run_id.as_deref() == Some(report.run_id.to_string().as_str())
            && e.event() == Some(EVENT_NO_ROW_LOCKS)
    });
    assert_eq!(warnings, 0);
}
