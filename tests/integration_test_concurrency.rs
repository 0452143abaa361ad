mod common;

use appointment_scheduler::{domain::models::booking::Requester, error::AppError};
use axum::http::{Method, StatusCode};
use chrono::{TimeZone, Utc};
use common::TestApp;
use serde_json::json;
use tokio::task::JoinSet;

fn requester(i: usize) -> Requester {
    Requester {
        name: format!("Requester {}", i),
        email: format!("r{}@example.com", i),
        phone: None,
        note: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reservations_have_one_winner() {
    let app = TestApp::new().await;
    app.seed_consultation().await;
    let start = Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap();
    let now = app.clock_now();

    let mut set = JoinSet::new();
    for i in 0..10 {
        let coordinator = app.state.coordinator.clone();
        set.spawn(async move { coordinator.reserve("consultation", start, requester(i), now).await });
    }

    let mut won = 0;
    let mut lost = 0;
    while let Some(result) = set.join_next().await {
        match result.unwrap() {
            Ok(_) => won += 1,
            Err(AppError::SlotUnavailable) => lost += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(lost, 9);

    let (_, all) = app.request(Method::GET, "/api/v1/admin/bookings", None, Some(&app.admin())).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reservations_respect_daily_cap() {
    let app = TestApp::new().await;
    app.seed_consultation().await;
    let (status, _) = app.request(
        Method::POST,
        "/api/v1/admin/session-types",
        Some(json!({ "name": "Quick", "slug": "quick", "duration_min": 15, "max_per_day": 2 })),
        Some(&app.admin()),
    ).await;
    assert_eq!(status, StatusCode::CREATED);
    let now = app.clock_now();

    let mut set = JoinSet::new();
    for i in 0..8 {
        let coordinator = app.state.coordinator.clone();
        let start = Utc.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap() + chrono::Duration::minutes(15 * i as i64);
        set.spawn(async move { coordinator.reserve("quick", start, requester(i), now).await });
    }

    let mut won = 0;
    while let Some(result) = set.join_next().await {
        if result.unwrap().is_ok() {
            won += 1;
        }
    }
    assert_eq!(won, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reserve_and_reschedule_racing_for_one_start() {
    for _ in 0..5 {
        let app = TestApp::new().await;
        app.seed_consultation().await;
        let (_, moving) = app.book("consultation", "2024-01-08", "09:00", "Ada").await;
        let token = moving["management_token"].as_str().unwrap().to_string();
        let target = Utc.with_ymd_and_hms(2024, 1, 8, 10, 15, 0).unwrap();
        let now = app.clock_now();

        let mut set = JoinSet::new();
        let coordinator = app.state.coordinator.clone();
        set.spawn(async move { coordinator.reschedule(&token, target, now).await });
        let coordinator = app.state.coordinator.clone();
        set.spawn(async move { coordinator.reserve("consultation", target, requester(1), now).await });

        let mut won = 0;
        while let Some(result) = set.join_next().await {
            match result.unwrap() {
                Ok(_) => won += 1,
                Err(AppError::SlotUnavailable) => {}
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        assert_eq!(won, 1);

        let (_, all) = app.request(Method::GET, "/api/v1/admin/bookings", None, Some(&app.admin())).await;
        let holding: Vec<&serde_json::Value> = all
            .as_array()
            .unwrap()
            .iter()
            .filter(|b| b["status"] == "confirmed" && b["start_time"] == "2024-01-08T10:15:00Z")
            .collect();
        assert_eq!(holding.len(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_cancels_record_one_transition() {
    let app = TestApp::new().await;
    app.seed_consultation().await;
    let (_, booking) = app.book("consultation", "2024-01-08", "09:00", "Ada").await;
    let uri = format!("/api/v1/bookings/manage/{}/cancel", booking["management_token"].as_str().unwrap());

    let (a, b) = tokio::join!(
        app.request(Method::POST, &uri, None, None),
        app.request(Method::POST, &uri, None, None),
    );
    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(b.0, StatusCode::OK);

    let history = app.state.booking_repo.list_transitions(booking["id"].as_str().unwrap()).await.unwrap();
    assert_eq!(history.len(), 2);
}
