pub mod availability;
pub mod booking;
pub mod booking_management;
pub mod health;
pub mod session_type;

use std::collections::HashMap;

use axum::body::Bytes;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;

use crate::error::AppError;

pub(crate) fn date_param(params: &HashMap<String, String>, key: &str) -> Result<NaiveDate, AppError> {
    let raw = params.get(key).ok_or_else(|| AppError::Validation(format!("{} required", key)))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid {} format (YYYY-MM-DD)", key)))
}

/// JSON body that may be omitted entirely.
pub(crate) fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e)))
}
