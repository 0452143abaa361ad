use axum::{extract::{State, Path, Query}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AdminPrincipal;
use crate::api::dtos::requests::{CreateOverrideRequest, ReplaceWeeklyRulesRequest};
use crate::api::handlers::date_param;
use crate::domain::models::availability::{AvailabilityOverride, WeeklyAvailabilityRule};
use crate::domain::services::catalog::{validate_override, validate_weekly_rules};
use crate::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

pub async fn get_weekly_rules(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(_): AdminPrincipal,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.availability_repo.list_weekly_rules().await?))
}

pub async fn replace_weekly_rules(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(admin): AdminPrincipal,
    Json(payload): Json<ReplaceWeeklyRulesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let now = state.clock.now();
    let rules: Vec<WeeklyAvailabilityRule> = payload.rules
        .into_iter()
        .map(|r| WeeklyAvailabilityRule::new(r.day_of_week, r.start_time, r.end_time, now))
        .collect();

    validate_weekly_rules(&rules)?;

    let saved = state.availability_repo.replace_weekly_rules(&rules).await?;
    info!(admin_id = %admin, rules = saved.len(), "Weekly availability replaced");
    Ok(Json(saved))
}

pub async fn list_overrides(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(_): AdminPrincipal,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let start = date_param(&params, "start")?;
    let end = date_param(&params, "end")?;
    if end < start {
        return Err(AppError::Validation("end must not be before start".into()));
    }
    Ok(Json(state.availability_repo.list_overrides(start, end).await?))
}

pub async fn create_override(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(admin): AdminPrincipal,
    Json(payload): Json<CreateOverrideRequest>,
) -> Result<impl IntoResponse, AppError> {
    let entry = AvailabilityOverride::new(payload.date, payload.kind, payload.note, state.clock.now());
    validate_override(&entry)?;

    let created = state.availability_repo.create_override(&entry).await?;
    info!(override_id = %created.id, admin_id = %admin, "Override {} added for {}", created.kind.tag(), created.date);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_override(
    State(state): State<Arc<AppState>>,
    AdminPrincipal(admin): AdminPrincipal,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.availability_repo.delete_override(&id).await?;
    info!(override_id = %id, admin_id = %admin, "Override removed");
    Ok(StatusCode::NO_CONTENT)
}
