mod common;

use common::*;
use flixdash::connection::{filter_family, order_by_preference};
use std::sync::Arc;

fn names(drivers: &[&str]) -> Vec<String> {
    drivers.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_preferred_version_sorts_first_and_stably() {
    let ordered = order_by_preference(names(&[DRIVER_17, DRIVER_18, "FreeTDS"]), "18");
    let order: Vec<&str> = ordered.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(order, vec![DRIVER_18, DRIVER_17, "FreeTDS"]);
    assert!(ordered[0].preferred);
    assert!(!ordered[1].preferred);
    assert!(!ordered[2].preferred);
}

#[test]
fn test_ordering_keeps_relative_order_within_groups() {
    let ordered = order_by_preference(
        names(&["A 18", "B", "C 18", "D", "E"]),
        "18",
    );
    let order: Vec<&str> = ordered.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(order, vec!["A 18", "C 18", "B", "D", "E"]);
}

#[test]
fn test_family_filter_drops_other_databases() {
    let matching = filter_family(
        names(&["PostgreSQL Unicode", DRIVER_17, "SQLite3", DRIVER_18]),
        "SQL Server",
    );
    assert_eq!(matching, names(&[DRIVER_17, DRIVER_18]));
}

#[test]
fn test_candidates_are_filtered_and_ordered() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mgr = manager(FakeCatalog::new(&["SQLite3", DRIVER_17, DRIVER_18]), notifier);
    let candidates = mgr.candidates().unwrap();
    let order: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(order, vec![DRIVER_18, DRIVER_17]);
}

#[test]
fn test_first_successful_driver_wins() {
    let catalog = FakeCatalog::new(&[DRIVER_17, DRIVER_18]);
    let db = Arc::clone(&catalog.db);
    let notifier = Arc::new(RecordingNotifier::default());
    let mut mgr = manager(catalog, notifier.clone());

    assert!(mgr.get_connection().is_some());
    assert_eq!(mgr.driver(), Some(DRIVER_18));
    let db = db.lock().unwrap();
    assert_eq!(db.opens, vec![DRIVER_18.to_string()], "later candidates must be skipped");
    assert_eq!(db.probes, 1, "liveness probe runs once on open");
    assert!(notifier.errors().is_empty());
}

#[test]
fn test_refused_driver_falls_through_to_next() {
    let catalog = FakeCatalog::new(&[DRIVER_17, DRIVER_18]).refusing(&[DRIVER_18]);
    let db = Arc::clone(&catalog.db);
    let mut mgr = manager(catalog, Arc::new(RecordingNotifier::default()));

    assert!(mgr.get_connection().is_some());
    assert_eq!(mgr.driver(), Some(DRIVER_17));
    assert_eq!(
        db.lock().unwrap().opens,
        vec![DRIVER_18.to_string(), DRIVER_17.to_string()]
    );
}

#[test]
fn test_failed_liveness_probe_counts_as_failed_candidate() {
    let catalog = FakeCatalog::new(&[DRIVER_17, DRIVER_18]).failing_probe(&[DRIVER_18]);
    let mut mgr = manager(catalog, Arc::new(RecordingNotifier::default()));

    assert!(mgr.get_connection().is_some());
    assert_eq!(mgr.driver(), Some(DRIVER_17));
}

#[test]
fn test_connection_is_reused() {
    let catalog = FakeCatalog::new(&[DRIVER_18]);
    let db = Arc::clone(&catalog.db);
    let mut mgr = manager(catalog, Arc::new(RecordingNotifier::default()));

    for _ in 0..5 {
        assert!(mgr.get_connection().is_some());
    }
    let db = db.lock().unwrap();
    assert_eq!(db.opens.len(), 1);
    assert_eq!(db.probes, 1, "no health check on reuse");
}

#[test]
fn test_exhaustion_reports_once_and_is_not_retried() {
    let catalog = FakeCatalog::new(&[DRIVER_17, DRIVER_18]).refusing(&[DRIVER_17, DRIVER_18]);
    let db = Arc::clone(&catalog.db);
    let notifier = Arc::new(RecordingNotifier::default());
    let mut mgr = manager(catalog, notifier.clone());

    assert!(mgr.get_connection().is_none());
    assert!(mgr.get_connection().is_none());
    assert!(mgr.get_connection().is_none());

    let errors = notifier.errors();
    assert_eq!(errors.len(), 1, "Got: {:?}", errors);
    assert!(errors[0].contains("failed with all available drivers"), "Got: {}", errors[0]);
    assert!(errors[0].contains(DRIVER_18));
    assert_eq!(db.lock().unwrap().opens.len(), 2, "no retry after exhaustion");
    assert!(mgr.failure().is_some());
    assert!(!mgr.is_open());
}

#[test]
fn test_no_matching_driver_lists_installed_drivers() {
    let notifier = Arc::new(RecordingNotifier::default());
    let mut mgr = manager(FakeCatalog::new(&["FreeTDS", "SQLite3"]), notifier.clone());

    assert!(mgr.get_connection().is_none());
    let errors = notifier.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("No SQL Server ODBC drivers found"), "Got: {}", errors[0]);
    assert!(errors[0].contains("FreeTDS"));
}

#[test]
fn test_close_drops_connection() {
    let mut mgr = manager(
        FakeCatalog::new(&[DRIVER_18]),
        Arc::new(RecordingNotifier::default()),
    );
    assert!(mgr.get_connection().is_some());
    assert!(mgr.is_open());

    mgr.close();
    assert!(!mgr.is_open());
    assert!(mgr.get_connection().is_none());
    assert_eq!(mgr.driver(), None);
    assert_eq!(mgr.failure(), Some("connection closed"));
}
