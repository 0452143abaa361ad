use axum::{
    body::Body,
    extract::Request,
    routing::{get, post, delete},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{availability, booking, booking_management, health, session_type};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tower_cookies::CookieManagerLayer;
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Public booking flow
        .route("/api/v1/session-types", get(session_type::list_active_session_types))
        .route("/api/v1/session-types/{slug}/slots", get(session_type::get_slots))
        .route("/api/v1/session-types/{slug}/dates", get(session_type::get_available_dates))
        .route("/api/v1/session-types/{slug}/book", post(booking::create_booking))

        // Requester booking management
        .route("/api/v1/bookings/manage/{token}", get(booking_management::get_booking_by_token))
        .route("/api/v1/bookings/manage/{token}/calendar.ics", get(booking_management::get_calendar))
        .route("/api/v1/bookings/manage/{token}/cancel", post(booking_management::cancel_booking))
        .route("/api/v1/bookings/manage/{token}/reschedule", post(booking_management::reschedule_booking))

        // Admin: catalog
        .route("/api/v1/admin/session-types", get(session_type::list_session_types).post(session_type::create_session_type))
        .route("/api/v1/admin/session-types/{id}", get(session_type::get_session_type).put(session_type::update_session_type).delete(session_type::delete_session_type))

        // Admin: availability
        .route("/api/v1/admin/availability/weekly", get(availability::get_weekly_rules).put(availability::replace_weekly_rules))
        .route("/api/v1/admin/availability/overrides", get(availability::list_overrides).post(availability::create_override))
        .route("/api/v1/admin/availability/overrides/{id}", delete(availability::delete_override))

        // Admin: bookings
        .route("/api/v1/admin/bookings", get(booking::list_bookings))
        .route("/api/v1/admin/bookings/{id}", get(booking::get_booking))
        .route("/api/v1/admin/bookings/{id}/history", get(booking::get_booking_history))
        .route("/api/v1/admin/bookings/{id}/confirm", post(booking::confirm_booking))
        .route("/api/v1/admin/bookings/{id}/cancel", post(booking::cancel_booking))
        .route("/api/v1/admin/bookings/{id}/complete", post(booking::complete_booking))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        admin_id = tracing::field::Empty,
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
