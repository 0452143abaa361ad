mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

async fn setup_sunday_night(app: &TestApp) {
    let admin = app.admin();
    let (status, _) = app.request(
        Method::POST,
        "/api/v1/admin/session-types",
        Some(json!({ "name": "Night call", "slug": "night-call", "duration_min": 30, "max_advance_days": 365 })),
        Some(&admin),
    ).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.request(
        Method::PUT,
        "/api/v1/admin/availability/weekly",
        Some(json!({ "rules": [{ "day_of_week": 0, "start_time": "01:00", "end_time": "04:00" }] })),
        Some(&admin),
    ).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_spring_forward_skips_the_missing_hour() {
    let app = TestApp::with_timezone("Europe/Berlin").await;
    setup_sunday_night(&app).await;

    let slots = app.slots("night-call", "2024-03-31").await;
    assert_eq!(slots, vec![
        "2024-03-31T01:00:00+01:00",
        "2024-03-31T01:30:00+01:00",
        "2024-03-31T03:00:00+02:00",
        "2024-03-31T03:30:00+02:00",
    ]);

    let (status, body) = app.book("night-call", "2024-03-31", "02:30", "Ada").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation");

    let (status, booking) = app.book("night-call", "2024-03-31", "03:00", "Ada").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["start_time"], "2024-03-31T01:00:00Z");
}

#[tokio::test]
async fn test_fall_back_keeps_the_repeated_hour_once() {
    let app = TestApp::with_timezone("Europe/Berlin").await;
    setup_sunday_night(&app).await;

    // 01:00 CEST to 04:00 CET spans four real hours.
    let slots = app.slots("night-call", "2024-10-27").await;
    assert_eq!(slots.len(), 8);
    assert_eq!(slots[0], "2024-10-27T01:00:00+02:00");
    assert_eq!(slots[7], "2024-10-27T03:30:00+01:00");
}
