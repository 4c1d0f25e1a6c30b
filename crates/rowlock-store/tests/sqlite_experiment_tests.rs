// Full experiment runs against SQLite files.

use rowlock_core::core_types::schema::{EVENT_NO_ROW_LOCKS, EVENT_TERMINATING};
use rowlock_core::logging_facility::test_capture::init_test_capture;
use rowlock_core::{experiment, ExperimentTiming, RowStore, SENTINEL_NAME};
use rowlock_store::{open_store, SqliteRowStore, StoreConfig};
use std::time::{Duration, Instant};

fn short_timing() -> ExperimentTiming {
    ExperimentTiming::new(Duration::from_millis(800), Duration::from_millis(200)).unwrap()
}

#[test]
fn test_john_keeps_his_name_jane_is_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteRowStore::new(dir.path().join("rows.db"));
    store.setup().unwrap();

    let started = Instant::now();
    let report = experiment::run(&store, &short_timing());

    assert!(report.is_clean(), "{:?}", report);
    assert!(started.elapsed() >= Duration::from_millis(800));

    let john = report.first_intercept.as_ref().unwrap();
    assert_eq!(john.rows_affected, 0);
    assert_eq!((john.row.name.as_str(), john.row.flag), ("john", true));

    let jane = report.second_intercept.as_ref().unwrap();
    assert_eq!(jane.rows_affected, 1);
    assert_eq!((jane.row.name.as_str(), jane.row.flag), (SENTINEL_NAME, false));

    // Read back on a fresh connection
    let mut session = store.connect().unwrap();
    let john = session.fetch_row(report.first_id).unwrap();
    assert_eq!((john.name.as_str(), john.flag), ("john", true));
    let jane = session.fetch_row(report.second_id).unwrap();
    assert_eq!((jane.name.as_str(), jane.flag), (SENTINEL_NAME, false));
}

#[test]
fn test_run_through_configured_store() {
    let capture = init_test_capture();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("configured.db");
    let config = StoreConfig::sqlite(path.to_string_lossy());

    let store = open_store(&config).unwrap();
    let report = experiment::run(store.as_ref(), &short_timing());

    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(store.backend(), "sqlite");
    capture.assert_event_exists("experiment", EVENT_TERMINATING);
}

#[test]
fn test_back_to_back_runs_start_from_an_empty_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::sqlite(dir.path().join("twice.db").to_string_lossy());

    let first = {
        let store = open_store(&config).unwrap();
        experiment::run(store.as_ref(), &short_timing())
    };
    let store = open_store(&config).unwrap();
    let second = experiment::run(store.as_ref(), &short_timing());

    assert!(first.is_clean());
    assert!(second.is_clean(), "{:?}", second);

    let mut session = store.connect().unwrap();
    assert!(session.fetch_row(first.first_id).is_err());
    assert!(session.fetch_row(second.first_id).unwrap().flag);
}

#[test]
fn test_whole_database_lock_is_announced_and_holds_back_the_free_row() {
    let capture = init_test_capture();
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteRowStore::new(dir.path().join("serialised.db"));
    store.setup().unwrap();
    let timing = short_timing();

    let report = experiment::run(&store, &timing);

    assert!(report.is_clean(), "{:?}", report);
    assert!(!store.row_level_locking());
    let warnings = capture.run_events(&report.run_id.to_string());
    let warnings: Vec<_> = warnings
        .iter()
        .filter(|e| e.event() == Some(EVENT_NO_ROW_LOCKS))
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field("backend"), Some("sqlite"));

    // Both interceptors wait for the updater's commit on this backend
    assert!(report.timings.first_intercept >= timing.hold());
    assert!(report.timings.second_intercept >= timing.hold());
}
