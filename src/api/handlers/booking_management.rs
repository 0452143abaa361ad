use axum::{body::Bytes, extract::{State, Path}, http::header, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::{parse_requested_start, CancelBookingRequest, RescheduleBookingRequest};
use crate::api::dtos::responses::{BookingResponse, ManagedBookingResponse};
use crate::api::handlers::optional_json;
use crate::domain::services::calendar::generate_ics;
use crate::domain::services::coordinator::CancelTarget;
use crate::error::AppError;
use std::sync::Arc;

pub async fn get_booking_by_token(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (booking, session_type) = state.coordinator.booking_by_token(&token).await?;
    let manage_url = state.coordinator.manage_url(&booking.management_token);
    Ok(Json(ManagedBookingResponse { booking, session_type, manage_url }))
}

pub async fn get_calendar(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (booking, session_type) = state.coordinator.booking_by_token(&token).await?;
    let ics = generate_ics(&session_type, &booking, &state.coordinator.manage_url(&token));

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"booking.ics\""),
        ],
        ics,
    ))
}

pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload: CancelBookingRequest = optional_json(&body)?;
    let booking = state.coordinator.cancel(CancelTarget::Token(&token), payload.reason, state.clock.now()).await?;
    let manage_url = state.coordinator.manage_url(&booking.management_token);
    Ok(Json(BookingResponse { booking, manage_url }))
}

pub async fn reschedule_booking(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<RescheduleBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_start = parse_requested_start(&state.coordinator.timezone(), &payload.date, &payload.time)?;
    let booking = state.coordinator.reschedule(&token, new_start, state.clock.now()).await?;
    let manage_url = state.coordinator.manage_url(&booking.management_token);
    Ok(Json(BookingResponse { booking, manage_url }))
}
