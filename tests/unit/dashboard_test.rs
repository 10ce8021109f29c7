mod common;

use common::*;
use flixdash::backend::{CellValue, SqlParam};
use flixdash::dashboard::{self, Page, WatchRequest};
use flixdash::error::DashError;
use flixdash::queries;

fn request(user: &str) -> WatchRequest {
    WatchRequest {
        user_id: user.to_string(),
        title_id: "tt0111161".to_string(),
        watch_percentage: 50,
        recommendations: 5,
    }
}

#[test]
fn test_overview_metrics_are_formatted() {
    let mut h = harness();
    let page = dashboard::render(&mut h.executor, Page::Overview, false).unwrap();

    let metrics: Vec<(&str, String)> = page.metrics.iter().map(|m| (m.label, m.display())).collect();
    assert_eq!(
        metrics,
        vec![
            ("Total Users", "1,204".to_string()),
            ("Active Subscriptions", "987".to_string()),
            ("Total Titles", "350".to_string()),
            ("Total Watches", "5,000".to_string()),
        ]
    );
    assert_eq!(page.panels.len(), 1);
    assert_eq!(page.panels[0].title, "Revenue Analysis");
}

#[test]
fn test_rerender_is_served_from_cache() {
    let mut h = harness();
    dashboard::render(&mut h.executor, Page::UserActivity, false).unwrap();
    let first = h.db.lock().unwrap().total_executions();

    dashboard::render(&mut h.executor, Page::UserActivity, false).unwrap();
    assert_eq!(h.db.lock().unwrap().total_executions(), first);
}

#[test]
fn test_offline_overview_shows_missing_metrics() {
    let catalog = FakeCatalog::new(&[DRIVER_18]).refusing(&[DRIVER_18]);
    let mut h = harness_with(catalog);

    let page = dashboard::render(&mut h.executor, Page::Overview, false).unwrap();
    assert!(page.metrics.iter().all(|m| m.value.is_none()));
    assert_eq!(page.metrics[0].display(), "n/a");
    assert_eq!(h.notifier.errors().len(), 1);
}

#[test]
fn test_strict_render_surfaces_connection_error() {
    let catalog = FakeCatalog::new(&[DRIVER_18]).refusing(&[DRIVER_18]);
    let mut h = harness_with(catalog);

    let err = dashboard::render(&mut h.executor, Page::GenrePerformance, true).unwrap_err();
    assert!(matches!(err, DashError::Connection { .. }), "Got: {:?}", err);
}

#[test]
fn test_simulate_watch_binds_parameters() {
    let mut h = harness();
    let outcome = dashboard::simulate_watch(&mut h.executor, &request("u42")).unwrap();

    let db = h.db.lock().unwrap();
    let insert = db
        .statements
        .iter()
        .find(|q| q.sql() == queries::INSERT_WATCH_SQL)
        .expect("insert should run");
    assert_eq!(
        insert.params(),
        &[
            SqlParam::Text("u42".to_string()),
            SqlParam::Text("tt0111161".to_string()),
            SqlParam::Float(0.5),
            SqlParam::Int(0),
        ]
    );
    assert_eq!(db.watches, 5001);

    assert_eq!(
        outcome.watch_time.get(0, "name"),
        Some(&CellValue::Text("user u42".to_string()))
    );
    assert_eq!(outcome.recommendations.rows.len(), 3);
}

#[test]
fn test_simulate_watch_passes_recommendation_limit() {
    let mut h = harness();
    let mut req = request("u1");
    req.recommendations = 2;
    let outcome = dashboard::simulate_watch(&mut h.executor, &req).unwrap();

    assert_eq!(outcome.recommendations.rows.len(), 2);
    let db = h.db.lock().unwrap();
    let recs = db
        .statements
        .iter()
        .find(|q| q.sql() == queries::USER_RECOMMENDATIONS_SQL)
        .unwrap();
    assert_eq!(recs.params()[1], SqlParam::Int(2));
}

#[test]
fn test_simulate_watch_rejects_out_of_range_input() {
    let mut h = harness();

    let mut req = request("u1");
    req.watch_percentage = 101;
    assert!(matches!(
        dashboard::simulate_watch(&mut h.executor, &req),
        Err(DashError::Validation { .. })
    ));

    let mut req = request("u1");
    req.recommendations = 0;
    assert!(matches!(
        dashboard::simulate_watch(&mut h.executor, &req),
        Err(DashError::Validation { .. })
    ));

    let req = request("  ");
    assert!(matches!(
        dashboard::simulate_watch(&mut h.executor, &req),
        Err(DashError::Validation { .. })
    ));

    assert_eq!(h.db.lock().unwrap().total_executions(), 0, "nothing runs on bad input");
}

#[test]
fn test_simulate_watch_fails_without_connection() {
    let catalog = FakeCatalog::new(&[DRIVER_18]).refusing(&[DRIVER_18]);
    let mut h = harness_with(catalog);

    let err = dashboard::simulate_watch(&mut h.executor, &request("u1")).unwrap_err();
    assert!(matches!(err, DashError::Connection { .. }), "Got: {:?}", err);
}

#[test]
fn test_offline_watch_error_points_back_to_reported_failure() {
    let catalog = FakeCatalog::new(&[DRIVER_18]).refusing(&[DRIVER_18]);
    let mut h = harness_with(catalog);

    let err = dashboard::simulate_watch(&mut h.executor, &request("u1")).unwrap_err();

    let errors = h.notifier.errors();
    assert_eq!(errors.len(), 1, "Got: {:?}", errors);
    assert!(errors[0].contains("failed with all available drivers"));
    let shown = err.to_string();
    assert!(
        !shown.contains("failed with all available drivers"),
        "failure details must not be repeated: {}",
        shown
    );
    assert!(shown.contains("see the connection error above"), "Got: {}", shown);
}

#[test]
fn test_empty_recommendations_show_notice() {
    let mut h = harness();
    let outcome = dashboard::simulate_watch(&mut h.executor, &request(NEW_USER)).unwrap();

    assert!(outcome.recommendations.is_empty());
    assert_eq!(h.notifier.infos(), vec!["No recommendations available yet.".to_string()]);
    assert!(h.notifier.errors().is_empty());
}

#[test]
fn test_recommendations_present_show_no_notice() {
    let mut h = harness();
    dashboard::simulate_watch(&mut h.executor, &request("u1")).unwrap();
    assert!(h.notifier.infos().is_empty());
}

#[test]
fn test_user_and_title_listings() {
    let mut h = harness();

    let users = dashboard::users(&mut h.executor).unwrap();
    assert_eq!(users.rows.len(), 2);
    assert_eq!(users.get(1, "name"), Some(&CellValue::Text("Grace".to_string())));

    let titles = dashboard::titles(&mut h.executor).unwrap();
    assert_eq!(titles.get(0, "title"), Some(&CellValue::Text("The Godfather".to_string())));
}

#[test]
fn test_resolve_title_by_name_or_id() {
    let mut h = harness();

    assert_eq!(
        dashboard::resolve_title(&mut h.executor, "The Shawshank Redemption").unwrap(),
        "tt0111161"
    );
    assert_eq!(dashboard::resolve_title(&mut h.executor, "tt0068646").unwrap(), "tt0068646");
    assert_eq!(
        h.db.lock().unwrap().executions_of(queries::TITLE_PICKER),
        1,
        "title list is cached between lookups"
    );

    let err = dashboard::resolve_title(&mut h.executor, "Nonexistent Movie").unwrap_err();
    assert!(matches!(err, DashError::Validation { .. }), "Got: {:?}", err);
}
