use axum::{body::Bytes, extract::{State, Path, Query}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AdminPrincipal;
use crate::api::dtos::requests::{parse_requested_start, CancelBookingRequest, CreateBookingRequest};
use crate::api::dtos::responses::BookingResponse;
use crate::api::handlers::optional_json;
use crate::domain::models::booking::{BookingFilter, BookingStatus};
use crate::domain::services::availability::day_bounds;
use crate::domain::services::coordinator::CancelTarget;
use crate::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::sync::Arc;

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let start = parse_requested_start(&state.coordinator.timezone(), &payload.date, &payload.time)?;
    let booking = state.coordinator.reserve(&slug, start, payload.requester(), state.clock.now()).await?;
    let manage_url = state.coordinator.manage_url(&booking.management_token);

    Ok((StatusCode::CREATED, Json(BookingResponse { booking, manage_url })))
}

/// `YYYY-MM-DD` is read as provider-local midnight; anything else must be RFC 3339.
fn instant_param(tz: &Tz, params: &HashMap<String, String>, key: &str) -> Result<Option<DateTime<Utc>>, AppError> {
    let Some(raw) = params.get(key) else { return Ok(None) };

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let bounds = day_bounds(tz, date).ok_or(AppError::Validation(format!("Invalid {} date", key)))?;
        return Ok(Some(bounds.start));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|_| AppError::Validation(format!("Invalid {} (YYYY-MM-DD or RFC 3339)", key)))
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(_): AdminPrincipal,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let tz = state.coordinator.timezone();

    let status = match params.get("status") {
        Some(raw) => Some(raw.parse::<BookingStatus>().map_err(|e| AppError::Validation(e.to_string()))?),
        None => None,
    };

    let filter = BookingFilter {
        status,
        session_type_id: params.get("session_type_id").cloned(),
        from: instant_param(&tz, &params, "from")?,
        to: instant_param(&tz, &params, "to")?,
    };

    Ok(Json(state.booking_repo.list(&filter).await?))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(_): AdminPrincipal,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.booking_repo.find_by_id(&id).await?
        .ok_or(AppError::NotFound("Booking not found".into()))?;
    Ok(Json(booking))
}

pub async fn get_booking_history(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(_): AdminPrincipal,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.coordinator.history(&id).await?))
}

pub async fn confirm_booking(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.coordinator.confirm(&id, &admin, state.clock.now()).await?))
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload: CancelBookingRequest = optional_json(&body)?;
    let target = CancelTarget::Admin { booking_id: &id, principal: &admin };
    Ok(Json(state.coordinator.cancel(target, payload.reason, state.clock.now()).await?))
}

pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.coordinator.complete(&id, &admin, state.clock.now()).await?))
}
