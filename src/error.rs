use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::domain::models::booking::BookingStatus;

/// The scheduling rule a request broke. Reported verbatim so callers can tell
/// the requester exactly why a start time was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyRule {
    InactiveSessionType,
    MinimumNotice,
    MaximumAdvance,
    DailyCap,
    SessionNotElapsed,
}

impl PolicyRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyRule::InactiveSessionType => "inactive_session_type",
            PolicyRule::MinimumNotice => "minimum_notice",
            PolicyRule::MaximumAdvance => "maximum_advance",
            PolicyRule::DailyCap => "daily_cap",
            PolicyRule::SessionNotElapsed => "session_not_elapsed",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            PolicyRule::InactiveSessionType => "This session type is not currently bookable",
            PolicyRule::MinimumNotice => "The requested start is inside the minimum notice period",
            PolicyRule::MaximumAdvance => "The requested start is too far in the future",
            PolicyRule::DailyCap => "The daily limit for this session type has been reached",
            PolicyRule::SessionNotElapsed => "The session has not finished yet",
        }
    }
}

impl std::fmt::Display for PolicyRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Policy violation: {0}")]
    PolicyViolation(PolicyRule),
    #[error("Slot is no longer available")]
    SlotUnavailable,
    #[error("Invalid management token")]
    InvalidManagementToken,
    #[error("Transition from {from} to {to} is not allowed")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Database(e) => {
                if let Some(db_err) = e.as_database_error() {
                    let code = db_err.code().unwrap_or_default();

                    // 2067 = SQLite Unique Constraint
                    // 23505 = PostgreSQL Unique Violation
                    if code == "2067" || code == "23505" {
                        return (
                            StatusCode::CONFLICT,
                            Json(json!({ "error": "Resource already exists (duplicate entry)", "code": "conflict" }))
                        ).into_response();
                    }
                }

                error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal server error".to_string())
            }
            AppError::Migration(e) => {
                error!("Migration error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal server error".to_string())
            }
            AppError::Io(e) => {
                error!("IO error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal server error".to_string())
            }
            AppError::Config(msg) => {
                error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal server error".to_string())
            }
            AppError::PolicyViolation(rule) => {
                let body = Json(json!({
                    "error": rule.describe(),
                    "code": "policy_violation",
                    "rule": rule,
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            AppError::SlotUnavailable => (
                StatusCode::CONFLICT,
                "slot_unavailable",
                "The selected time slot is no longer available".to_string(),
            ),
            AppError::InvalidManagementToken => (
                StatusCode::NOT_FOUND,
                "invalid_management_token",
                "Invalid management token".to_string(),
            ),
            AppError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition", self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized".to_string()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation", msg.clone()),
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", "Internal error".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}
