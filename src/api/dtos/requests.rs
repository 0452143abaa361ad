use crate::domain::models::{
    availability::{hhmm, OverrideKind},
    booking::Requester,
};
use crate::error::AppError;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateSessionTypeRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub duration_min: i32,
    pub buffer_before_min: Option<i32>,
    pub buffer_after_min: Option<i32>,
    pub min_notice_hours: Option<i32>,
    pub max_advance_days: Option<i32>,
    pub max_per_day: Option<i32>,
    pub requires_confirmation: Option<bool>,
    pub is_active: Option<bool>,
}

/// Partial update. `max_per_day: null` clears the cap; omitting it leaves it alone.
#[derive(Deserialize)]
pub struct UpdateSessionTypeRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub duration_min: Option<i32>,
    pub buffer_before_min: Option<i32>,
    pub buffer_after_min: Option<i32>,
    pub min_notice_hours: Option<i32>,
    pub max_advance_days: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub max_per_day: Option<Option<i32>>,
    pub requires_confirmation: Option<bool>,
    pub is_active: Option<bool>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i32>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
pub struct WeeklyRuleRequest {
    pub day_of_week: i32,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

#[derive(Deserialize)]
pub struct ReplaceWeeklyRulesRequest {
    pub rules: Vec<WeeklyRuleRequest>,
}

#[derive(Deserialize)]
pub struct CreateOverrideRequest {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub kind: OverrideKind,
    pub note: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub date: String,
    pub time: String,
    pub requester_name: String,
    pub requester_email: String,
    pub requester_phone: Option<String>,
    pub requester_note: Option<String>,
}

impl CreateBookingRequest {
    pub fn requester(&self) -> Requester {
        Requester {
            name: self.requester_name.clone(),
            email: self.requester_email.clone(),
            phone: self.requester_phone.clone(),
            note: self.requester_note.clone(),
        }
    }
}

#[derive(Deserialize)]
pub struct RescheduleBookingRequest {
    pub date: String,
    pub time: String,
}

#[derive(Deserialize, Default)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

/// Turns a `date` plus `time` pair into an instant. `time` is either `HH:MM`
/// in the provider timezone or a full RFC 3339 timestamp.
pub fn parse_requested_start(tz: &Tz, date: &str, time: &str) -> Result<DateTime<Utc>, AppError> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Invalid date format (YYYY-MM-DD)".into()))?;

    if time.contains('T') {
        let dt = DateTime::parse_from_rfc3339(time)
            .map_err(|_| AppError::Validation("Invalid ISO time format".into()))?;
        if dt.with_timezone(tz).date_naive() != date {
            return Err(AppError::Validation("time does not fall on the given date".into()));
        }
        return Ok(dt.with_timezone(&Utc));
    }

    let time = hhmm::parse(time).ok_or(AppError::Validation("Invalid time format (HH:MM)".into()))?;

    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or(AppError::Validation("Local time does not exist (skipped by DST)".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_and_rfc3339_times_agree() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        let local = parse_requested_start(&tz, "2024-01-08", "09:00").unwrap();
        let iso = parse_requested_start(&tz, "2024-01-08", "2024-01-08T09:00:00+01:00").unwrap();
        assert_eq!(local, iso);
        assert_eq!(local.to_rfc3339(), "2024-01-08T08:00:00+00:00");
    }

    #[test]
    fn rejects_garbage_and_mismatched_dates() {
        let tz = chrono_tz::UTC;
        assert!(parse_requested_start(&tz, "08/01/2024", "09:00").is_err());
        assert!(parse_requested_start(&tz, "2024-01-08", "9am").is_err());
        assert!(parse_requested_start(&tz, "2024-01-08", "2024-01-09T09:00:00Z").is_err());
    }

    #[test]
    fn null_cap_is_distinguished_from_missing() {
        let cleared: UpdateSessionTypeRequest = serde_json::from_str(r#"{"max_per_day": null}"#).unwrap();
        assert_eq!(cleared.max_per_day, Some(None));
        let untouched: UpdateSessionTypeRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(untouched.max_per_day, None);
    }
}
