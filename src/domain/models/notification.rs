use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::models::booking::Requester;

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_COMPLETED: &str = "COMPLETED";
pub const STATUS_FAILED: &str = "FAILED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingReserved,
    BookingConfirmed,
    BookingCancelled,
    BookingRescheduled,
    BookingCompleted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingReserved => "booking_reserved",
            NotificationKind::BookingConfirmed => "booking_confirmed",
            NotificationKind::BookingCancelled => "booking_cancelled",
            NotificationKind::BookingRescheduled => "booking_rescheduled",
            NotificationKind::BookingCompleted => "booking_completed",
        }
    }
}

/// Snapshot handed to the notification sink. Times are rendered in the provider timezone.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationPayload {
    pub booking_id: String,
    pub status: String,
    pub session_type: String,
    pub start_local: String,
    pub end_local: String,
    pub timezone: String,
    pub requester: Requester,
    pub manage_url: String,
    pub previous_start_local: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Notification {
    pub id: String,
    pub kind: String,
    pub booking_id: String,
    pub payload: Json<NotificationPayload>,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, payload: NotificationPayload, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: kind.as_str().to_string(),
            booking_id: payload.booking_id.clone(),
            payload: Json(payload),
            status: STATUS_PENDING.to_string(),
            error_message: None,
            created_at: now,
        }
    }
}
