use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct SessionType {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub duration_min: i32,
    pub buffer_before_min: i32,
    pub buffer_after_min: i32,
    pub min_notice_hours: i32,
    pub max_advance_days: i32,
    pub max_per_day: Option<i32>,
    pub requires_confirmation: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct NewSessionTypeParams {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub duration_min: i32,
    pub buffer_before_min: i32,
    pub buffer_after_min: i32,
    pub min_notice_hours: i32,
    pub max_advance_days: i32,
    pub max_per_day: Option<i32>,
    pub requires_confirmation: bool,
    pub is_active: bool,
}

impl SessionType {
    pub fn new(params: NewSessionTypeParams, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: params.name,
            slug: params.slug,
            description: params.description,
            duration_min: params.duration_min,
            buffer_before_min: params.buffer_before_min,
            buffer_after_min: params.buffer_after_min,
            min_notice_hours: params.min_notice_hours,
            max_advance_days: params.max_advance_days,
            max_per_day: params.max_per_day,
            requires_confirmation: params.requires_confirmation,
            is_active: params.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_min as i64)
    }

    pub fn buffer_before(&self) -> Duration {
        Duration::minutes(self.buffer_before_min as i64)
    }

    pub fn buffer_after(&self) -> Duration {
        Duration::minutes(self.buffer_after_min as i64)
    }

    /// Time a single booking of this type occupies on the calendar, buffers included.
    pub fn footprint_min(&self) -> i64 {
        (self.buffer_before_min + self.duration_min + self.buffer_after_min) as i64
    }

    /// Earliest start the notice period allows at `now`. Saturates at the end of representable time.
    pub fn earliest_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(Duration::hours(self.min_notice_hours as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Latest start the advance window allows at `now`.
    pub fn latest_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(Duration::days(self.max_advance_days as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
