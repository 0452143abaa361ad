use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;
use std::fmt;

use crate::domain::models::session_type::SessionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Rescheduled,
    Completed,
}

#[derive(Debug, Error)]
#[error("unknown booking status '{0}'")]
pub struct UnknownStatus(String);

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rescheduled => "rescheduled",
            BookingStatus::Completed => "completed",
        }
    }

    /// Whether a booking in this status occupies the calendar. Completed sessions
    /// keep their after-buffer.
    pub fn occupies_calendar(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Completed)
    }

    /// Whether a booking in this status counts toward a session type's daily cap.
    pub fn counts_toward_daily_cap(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Completed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Rescheduled | BookingStatus::Completed)
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled)
                | (Confirmed, Cancelled) | (Confirmed, Rescheduled) | (Confirmed, Completed)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "rescheduled" => Ok(BookingStatus::Rescheduled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Contact details handed over by the CRM side. Passed through as-is.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Requester {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Booking {
    pub id: String,
    pub session_type_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub blocked_start: DateTime<Utc>,
    pub blocked_end: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    pub requester_name: String,
    pub requester_email: String,
    pub requester_phone: Option<String>,
    pub requester_note: Option<String>,
    pub management_token: String,
    pub rescheduled_from: Option<String>,
    pub rescheduled_to: Option<String>,
    pub cancelled_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewBookingParams<'a> {
    pub session_type: &'a SessionType,
    pub start: DateTime<Utc>,
    pub requester: Requester,
    pub rescheduled_from: Option<String>,
    pub now: DateTime<Utc>,
}

pub fn generate_management_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

impl Booking {
    pub fn new(params: NewBookingParams<'_>) -> Self {
        let session_type = params.session_type;
        let end_time = params.start + session_type.duration();

        let status = if session_type.requires_confirmation {
            BookingStatus::Pending
        } else {
            BookingStatus::Confirmed
        };

        Self {
            id: Uuid::new_v4().to_string(),
            session_type_id: session_type.id.clone(),
            start_time: params.start,
            end_time,
            blocked_start: params.start - session_type.buffer_before(),
            blocked_end: end_time + session_type.buffer_after(),
            status,
            requester_name: params.requester.name,
            requester_email: params.requester.email,
            requester_phone: params.requester.phone,
            requester_note: params.requester.note,
            management_token: generate_management_token(),
            rescheduled_from: params.rescheduled_from,
            rescheduled_to: None,
            cancelled_reason: None,
            cancelled_at: None,
            created_at: params.now,
            updated_at: params.now,
        }
    }

    pub fn requester(&self) -> Requester {
        Requester {
            name: self.requester_name.clone(),
            email: self.requester_email.clone(),
            phone: self.requester_phone.clone(),
            note: self.requester_note.clone(),
        }
    }
}

/// Who caused a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Requester,
    Admin(String),
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Requester => f.write_str("requester"),
            Actor::Admin(principal) => write!(f, "admin:{}", principal),
        }
    }
}

/// One entry of a booking's audit trail.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct BookingTransition {
    pub id: String,
    pub booking_id: String,
    pub from_status: Option<String>,
    pub to_status: String,
    pub actor: String,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl BookingTransition {
    pub fn new(
        booking_id: &str,
        from: Option<BookingStatus>,
        to: BookingStatus,
        actor: &Actor,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            booking_id: booking_id.to_string(),
            from_status: from.map(|s| s.as_str().to_string()),
            to_status: to.as_str().to_string(),
            actor: actor.to_string(),
            reason,
            occurred_at: at,
        }
    }
}

/// Field changes that accompany a status transition.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub cancelled_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub at: DateTime<Utc>,
}

/// Daily-cap condition re-checked by the ledger's conditional insert.
/// `day_start..day_end` is the provider-local calendar day in UTC.
#[derive(Debug, Clone)]
pub struct DailyCap {
    pub day_start: DateTime<Utc>,
    pub day_end: DateTime<Utc>,
    pub limit: Option<i32>,
}

impl DailyCap {
    /// Bound used in SQL when the session type has no cap.
    pub fn limit_or_max(&self) -> i64 {
        self.limit.map(i64::from).unwrap_or(i64::MAX)
    }
}

/// Admin listing filter. Bounds are UTC instants on `start_time`.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub session_type_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}
