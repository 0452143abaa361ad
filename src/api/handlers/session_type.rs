use axum::{extract::{State, Path, Query}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AdminPrincipal;
use crate::api::dtos::requests::{CreateSessionTypeRequest, UpdateSessionTypeRequest};
use crate::api::dtos::responses::{AvailableDatesResponse, SlotsResponse};
use crate::api::handlers::date_param;
use crate::domain::models::session_type::{NewSessionTypeParams, SessionType};
use crate::domain::services::catalog::validate_session_type;
use crate::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub async fn list_active_session_types(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let session_types = state.session_type_repo.list(true).await?;
    Ok(Json(session_types))
}

pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let date = date_param(&params, "date")?;
    let slots = state.coordinator.list_slots(&slug, date, state.clock.now()).await?;
    Ok(Json(SlotsResponse::new(date, state.coordinator.timezone(), &slots)))
}

pub async fn get_available_dates(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let start = date_param(&params, "start")?;
    let end = date_param(&params, "end")?;
    let dates = state.coordinator.available_dates(&slug, start, end, state.clock.now()).await?;
    Ok(Json(AvailableDatesResponse { dates }))
}

pub async fn list_session_types(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(_): AdminPrincipal,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.session_type_repo.list(false).await?))
}

pub async fn create_session_type(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(admin): AdminPrincipal,
    Json(payload): Json<CreateSessionTypeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session_type = SessionType::new(NewSessionTypeParams {
        name: payload.name.trim().to_string(),
        slug: payload.slug.trim().to_string(),
        description: payload.description,
        duration_min: payload.duration_min,
        buffer_before_min: payload.buffer_before_min.unwrap_or(0),
        buffer_after_min: payload.buffer_after_min.unwrap_or(0),
        min_notice_hours: payload.min_notice_hours.unwrap_or(0),
        max_advance_days: payload.max_advance_days.unwrap_or(60),
        max_per_day: payload.max_per_day,
        requires_confirmation: payload.requires_confirmation.unwrap_or(false),
        is_active: payload.is_active.unwrap_or(true),
    }, state.clock.now());

    validate_session_type(&session_type)?;

    let created = state.session_type_repo.create(&session_type).await?;
    info!(session_type_id = %created.id, admin_id = %admin, "Session type created: {}", created.slug);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_session_type(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(_): AdminPrincipal,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session_type = state.session_type_repo.find_by_id(&id).await?
        .ok_or(AppError::NotFound("Session type not found".into()))?;
    Ok(Json(session_type))
}

pub async fn update_session_type(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
    Json(payload): Json<UpdateSessionTypeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut session_type = state.session_type_repo.find_by_id(&id).await?
        .ok_or(AppError::NotFound("Session type not found".into()))?;

    if let Some(v) = payload.name { session_type.name = v.trim().to_string(); }
    if let Some(v) = payload.slug { session_type.slug = v.trim().to_string(); }
    if let Some(v) = payload.description { session_type.description = Some(v); }
    if let Some(v) = payload.duration_min { session_type.duration_min = v; }
    if let Some(v) = payload.buffer_before_min { session_type.buffer_before_min = v; }
    if let Some(v) = payload.buffer_after_min { session_type.buffer_after_min = v; }
    if let Some(v) = payload.min_notice_hours { session_type.min_notice_hours = v; }
    if let Some(v) = payload.max_advance_days { session_type.max_advance_days = v; }
    if let Some(v) = payload.max_per_day { session_type.max_per_day = v; }
    if let Some(v) = payload.requires_confirmation { session_type.requires_confirmation = v; }
    if let Some(v) = payload.is_active { session_type.is_active = v; }
    session_type.updated_at = state.clock.now();

    validate_session_type(&session_type)?;

    let updated = state.session_type_repo.update(&session_type).await?;
    info!(session_type_id = %updated.id, admin_id = %admin, "Session type updated");
    Ok(Json(updated))
}

pub async fn delete_session_type(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.session_type_repo.delete(&id).await?;
    info!(session_type_id = %id, admin_id = %admin, "Session type deleted");
    Ok(StatusCode::NO_CONTENT)
}
