mod common;

use axum::http::{Method, StatusCode};
use chrono::{TimeZone, Utc};
use common::TestApp;
use serde_json::{json, Value};

const MONDAY: &str = "2024-01-08";

async fn create_type(app: &TestApp, body: Value) -> Value {
    let (status, created) = app.request(
        Method::POST,
        "/api/v1/admin/session-types",
        Some(body),
        Some(&app.admin()),
    ).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    created
}

fn token(booking: &Value) -> String {
    booking["management_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_reservation_returns_booking_with_manage_link() {
    let app = TestApp::new().await;
    app.seed_consultation().await;

    let (status, booking) = app.book("consultation", MONDAY, "09:00", "Ada").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["start_time"], "2024-01-08T09:00:00Z");
    assert_eq!(booking["end_time"], "2024-01-08T10:00:00Z");
    assert_eq!(booking["blocked_end"], "2024-01-08T10:15:00Z");
    assert_eq!(token(&booking).len(), 48);
    assert_eq!(
        booking["manage_url"],
        format!("https://book.example.com/api/v1/bookings/manage/{}", token(&booking))
    );

    let (status, managed) = app.request(
        Method::GET,
        &format!("/api/v1/bookings/manage/{}", token(&booking)),
        None,
        None,
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(managed["booking"]["id"], booking["id"]);
    assert_eq!(managed["session_type"]["slug"], "consultation");
}

#[tokio::test]
async fn test_rfc3339_start_is_accepted() {
    let app = TestApp::new().await;
    app.seed_consultation().await;

    let (status, booking) = app.book("consultation", MONDAY, "2024-01-08T10:15:00Z", "Ada").await;
    assert_eq!(status, StatusCode::CREATED, "{}", booking);
    assert_eq!(booking["start_time"], "2024-01-08T10:15:00Z");
}

#[tokio::test]
async fn test_unknown_token_is_rejected() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/v1/bookings/manage/not-a-token", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "invalid_management_token");
}

#[tokio::test]
async fn test_taken_and_off_grid_starts_are_unavailable() {
    let app = TestApp::new().await;
    app.seed_consultation().await;

    let (status, _) = app.book("consultation", MONDAY, "09:00", "Ada").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.book("consultation", MONDAY, "09:00", "Grace").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "slot_unavailable");

    let (status, _) = app.book("consultation", MONDAY, "10:30", "Grace").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_policy_violations_name_the_rule() {
    let app = TestApp::new().await;
    app.seed_consultation().await;
    create_type(&app, json!({
        "name": "Review", "slug": "review", "duration_min": 30, "min_notice_hours": 24
    })).await;
    create_type(&app, json!({
        "name": "Capped", "slug": "capped", "duration_min": 60, "buffer_after_min": 15, "max_per_day": 1
    })).await;

    // Monday 2024-01-01 09:00 is one hour away.
    let (status, body) = app.book("review", "2024-01-01", "09:00", "Ada").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["rule"], "minimum_notice");

    let (status, body) = app.book("consultation", "2024-03-11", "09:00", "Ada").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["rule"], "maximum_advance");

    let (status, _) = app.book("capped", MONDAY, "09:00", "Ada").await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app.book("capped", MONDAY, "10:15", "Grace").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["rule"], "daily_cap");
    assert!(app.slots("capped", MONDAY).await.is_empty());
}

#[tokio::test]
async fn test_inactive_type_lists_nothing_and_refuses_bookings() {
    let app = TestApp::new().await;
    let created = app.seed_consultation().await;

    let (status, _) = app.request(
        Method::PUT,
        &format!("/api/v1/admin/session-types/{}", created["id"].as_str().unwrap()),
        Some(json!({ "is_active": false })),
        Some(&app.admin()),
    ).await;
    assert_eq!(status, StatusCode::OK);

    assert!(app.slots("consultation", MONDAY).await.is_empty());
    let (status, body) = app.book("consultation", MONDAY, "09:00", "Ada").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["rule"], "inactive_session_type");

    let (_, listed) = app.request(Method::GET, "/api/v1/session-types", None, None).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_requester_fields_are_stored_as_given() {
    let app = TestApp::new().await;
    app.seed_consultation().await;

    let (status, booking) = app.request(
        Method::POST,
        "/api/v1/session-types/consultation/book",
        Some(json!({ "date": MONDAY, "time": "09:00", "requester_name": "", "requester_email": "ada-at-home" })),
        None,
    ).await;
    assert_eq!(status, StatusCode::CREATED, "{}", booking);
    assert_eq!(booking["requester_name"], "");
    assert_eq!(booking["requester_email"], "ada-at-home");
}

#[tokio::test]
async fn test_malformed_time_is_rejected() {
    let app = TestApp::new().await;
    app.seed_consultation().await;

    let (status, _) = app.request(
        Method::POST,
        "/api/v1/session-types/consultation/book",
        Some(json!({ "date": MONDAY, "time": "9 o'clock", "requester_name": "Ada", "requester_email": "ada@example.com" })),
        None,
    ).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pending_confirm_complete_flow() {
    let app = TestApp::new().await;
    app.seed_consultation().await;
    create_type(&app, json!({
        "name": "Review", "slug": "review", "duration_min": 30, "requires_confirmation": true
    })).await;
    let admin = app.admin();

    let (status, booking) = app.book("review", MONDAY, "09:00", "Ada").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "pending");
    let id = booking["id"].as_str().unwrap().to_string();

    // A pending booking already holds its slot.
    assert_eq!(app.slots("review", MONDAY).await[0], "2024-01-08T09:30:00+00:00");

    let (status, confirmed) = app.request(Method::POST, &format!("/api/v1/admin/bookings/{}/confirm", id), None, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");

    let (status, body) = app.request(Method::POST, &format!("/api/v1/admin/bookings/{}/confirm", id), None, Some(&admin)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");

    let (status, body) = app.request(Method::POST, &format!("/api/v1/admin/bookings/{}/complete", id), None, Some(&admin)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["rule"], "session_not_elapsed");

    app.clock.set(Utc.with_ymd_and_hms(2024, 1, 8, 9, 30, 0).unwrap());
    let (status, completed) = app.request(Method::POST, &format!("/api/v1/admin/bookings/{}/complete", id), None, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "completed");

    // Cancelling a settled booking changes nothing.
    let (status, same) = app.request(
        Method::POST,
        &format!("/api/v1/bookings/manage/{}/cancel", token(&booking)),
        None,
        None,
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(same["status"], "completed");

    let (status, history) = app.request(Method::GET, &format!("/api/v1/admin/bookings/{}/history", id), None, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let steps: Vec<&str> = history.as_array().unwrap().iter().map(|t| t["to_status"].as_str().unwrap()).collect();
    assert_eq!(steps, vec!["pending", "confirmed", "completed"]);
    assert_eq!(history[1]["actor"], "admin:admin-1");
}

#[tokio::test]
async fn test_requester_cancel_is_idempotent_and_frees_the_slot() {
    let app = TestApp::new().await;
    app.seed_consultation().await;

    let (_, booking) = app.book("consultation", MONDAY, "10:15", "Ada").await;
    let uri = format!("/api/v1/bookings/manage/{}/cancel", token(&booking));

    let (status, cancelled) = app.request(Method::POST, &uri, Some(json!({ "reason": "Sick" })), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["cancelled_reason"], "Sick");

    let (status, again) = app.request(Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["status"], "cancelled");
    assert_eq!(again["cancelled_reason"], "Sick");

    assert_eq!(app.slots("consultation", MONDAY).await.len(), 2);

    let history = app.state.booking_repo.list_transitions(booking["id"].as_str().unwrap()).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].actor, "requester");
}

#[tokio::test]
async fn test_admin_cancel_with_reason() {
    let app = TestApp::new().await;
    app.seed_consultation().await;
    let admin = app.admin();

    let (_, booking) = app.book("consultation", MONDAY, "09:00", "Ada").await;
    let (status, cancelled) = app.request(
        Method::POST,
        &format!("/api/v1/admin/bookings/{}/cancel", booking["id"].as_str().unwrap()),
        Some(json!({ "reason": "Provider unavailable" })),
        Some(&admin),
    ).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["cancelled_reason"], "Provider unavailable");
}

#[tokio::test]
async fn test_reschedule_links_old_and_new_bookings() {
    let app = TestApp::new().await;
    app.seed_consultation().await;

    let (_, original) = app.book("consultation", MONDAY, "09:00", "Ada").await;
    let uri = format!("/api/v1/bookings/manage/{}/reschedule", token(&original));

    let (status, moved) = app.request(Method::POST, &uri, Some(json!({ "date": MONDAY, "time": "10:15" })), None).await;
    assert_eq!(status, StatusCode::OK, "{}", moved);
    assert_eq!(moved["status"], "confirmed");
    assert_eq!(moved["start_time"], "2024-01-08T10:15:00Z");
    assert_eq!(moved["rescheduled_from"], original["id"]);
    assert_ne!(token(&moved), token(&original));

    let (_, old) = app.request(Method::GET, &format!("/api/v1/bookings/manage/{}", token(&original)), None, None).await;
    assert_eq!(old["booking"]["status"], "rescheduled");
    assert_eq!(old["booking"]["rescheduled_to"], moved["id"]);

    // The old record no longer holds 09:00.
    assert_eq!(app.slots("consultation", MONDAY).await, vec!["2024-01-08T09:00:00+00:00"]);

    // The old token now points at a rescheduled record, which cannot move again.
    let (status, body) = app.request(Method::POST, &uri, Some(json!({ "date": MONDAY, "time": "09:00" })), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");
}

#[tokio::test]
async fn test_reschedule_onto_a_taken_slot_changes_nothing() {
    let app = TestApp::new().await;
    app.seed_consultation().await;

    let (_, first) = app.book("consultation", MONDAY, "09:00", "Ada").await;
    let (_, second) = app.book("consultation", MONDAY, "10:15", "Grace").await;
    let first_id = first["id"].as_str().unwrap();

    let (status, body) = app.request(
        Method::POST,
        &format!("/api/v1/bookings/manage/{}/reschedule", token(&first)),
        Some(json!({ "date": MONDAY, "time": "10:15" })),
        None,
    ).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "slot_unavailable");

    let (_, managed) = app.request(Method::GET, &format!("/api/v1/bookings/manage/{}", token(&first)), None, None).await;
    assert_eq!(managed["booking"]["status"], "confirmed");
    assert_eq!(managed["booking"]["start_time"], "2024-01-08T09:00:00Z");
    assert!(managed["booking"]["rescheduled_to"].is_null());

    let (_, all) = app.request(Method::GET, "/api/v1/admin/bookings", None, Some(&app.admin())).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    assert_eq!(app.state.booking_repo.list_transitions(first_id).await.unwrap().len(), 1);
    assert_eq!(app.state.notification_repo.list_by_booking(first_id).await.unwrap().len(), 1);
    assert_eq!(
        app.state.notification_repo.list_by_booking(second["id"].as_str().unwrap()).await.unwrap().len(),
        1
    );

    let outbox: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(outbox, 2);
    let transitions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM booking_transitions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(transitions, 2);
}

#[tokio::test]
async fn test_reschedule_may_overlap_its_own_old_slot() {
    let app = TestApp::new().await;
    app.seed_consultation().await;
    let admin = app.admin();
    app.request(
        Method::PUT,
        "/api/v1/admin/availability/weekly",
        Some(json!({ "rules": [{ "day_of_week": 1, "start_time": "09:00", "end_time": "10:30" }] })),
        Some(&admin),
    ).await;

    let (_, original) = app.book("consultation", MONDAY, "09:00", "Ada").await;
    assert!(app.slots("consultation", MONDAY).await.is_empty());

    // Only one footprint fits the window; the booking being moved must not block itself.
    let (status, moved) = app.request(
        Method::POST,
        &format!("/api/v1/bookings/manage/{}/reschedule", token(&original)),
        Some(json!({ "date": MONDAY, "time": "09:00" })),
        None,
    ).await;
    assert_eq!(status, StatusCode::OK, "{}", moved);
    assert_eq!(moved["rescheduled_from"], original["id"]);
}

#[tokio::test]
async fn test_pending_booking_cannot_be_rescheduled() {
    let app = TestApp::new().await;
    app.seed_consultation().await;
    create_type(&app, json!({
        "name": "Review", "slug": "review", "duration_min": 30, "requires_confirmation": true
    })).await;

    let (_, booking) = app.book("review", MONDAY, "09:00", "Ada").await;
    let (status, body) = app.request(
        Method::POST,
        &format!("/api/v1/bookings/manage/{}/reschedule", token(&booking)),
        Some(json!({ "date": MONDAY, "time": "10:00" })),
        None,
    ).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");
}

#[tokio::test]
async fn test_calendar_export() {
    let app = TestApp::new().await;
    app.seed_consultation().await;
    let (_, booking) = app.book("consultation", MONDAY, "09:00", "Ada").await;

    let response = {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;
        app.router.clone().oneshot(
            Request::builder()
                .uri(format!("/api/v1/bookings/manage/{}/calendar.ics", token(&booking)))
                .body(Body::empty())
                .unwrap(),
        ).await.unwrap()
    };
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"].to_str().unwrap().starts_with("text/calendar"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let ics = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(ics.contains("BEGIN:VEVENT"));
    assert!(ics.contains("DTSTART:20240108T090000Z"));
    assert!(ics.contains("STATUS:CONFIRMED"));
}
