use crate::domain::models::{
    availability::{AvailabilityOverride, WeeklyAvailabilityRule},
    session_type::SessionType,
};
use crate::domain::services::availability::{window_minutes, Interval};
use crate::error::AppError;

pub const DURATION_RANGE: std::ops::RangeInclusive<i32> = 15..=480;
pub const BUFFER_RANGE: std::ops::RangeInclusive<i32> = 0..=120;
pub const NOTICE_HOURS_RANGE: std::ops::RangeInclusive<i32> = 0..=8760;
pub const ADVANCE_DAYS_RANGE: std::ops::RangeInclusive<i32> = 1..=3650;
const SLUG_MAX_LEN: usize = 64;

pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    if slug.is_empty() || slug.len() > SLUG_MAX_LEN {
        return Err(AppError::Validation(format!("slug must be 1-{} characters", SLUG_MAX_LEN)));
    }
    if !slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return Err(AppError::Validation("slug may only contain a-z, 0-9 and '-'".into()));
    }
    Ok(())
}

pub fn validate_session_type(st: &SessionType) -> Result<(), AppError> {
    if st.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }
    validate_slug(&st.slug)?;

    if !DURATION_RANGE.contains(&st.duration_min) {
        return Err(AppError::Validation(format!(
            "duration_min must be between {} and {}",
            DURATION_RANGE.start(),
            DURATION_RANGE.end()
        )));
    }
    for (field, value) in [("buffer_before_min", st.buffer_before_min), ("buffer_after_min", st.buffer_after_min)] {
        if !BUFFER_RANGE.contains(&value) {
            return Err(AppError::Validation(format!(
                "{} must be between {} and {}",
                field,
                BUFFER_RANGE.start(),
                BUFFER_RANGE.end()
            )));
        }
    }
    if !NOTICE_HOURS_RANGE.contains(&st.min_notice_hours) {
        return Err(AppError::Validation(format!(
            "min_notice_hours must be between {} and {}",
            NOTICE_HOURS_RANGE.start(),
            NOTICE_HOURS_RANGE.end()
        )));
    }
    if !ADVANCE_DAYS_RANGE.contains(&st.max_advance_days) {
        return Err(AppError::Validation(format!(
            "max_advance_days must be between {} and {}",
            ADVANCE_DAYS_RANGE.start(),
            ADVANCE_DAYS_RANGE.end()
        )));
    }
    if let Some(cap) = st.max_per_day
        && cap < 1 {
        return Err(AppError::Validation("max_per_day must be positive when set".into()));
    }
    Ok(())
}

/// A full week of rules: valid weekdays, non-empty windows, no overlap within a day.
pub fn validate_weekly_rules(rules: &[WeeklyAvailabilityRule]) -> Result<(), AppError> {
    let mut by_day: Vec<Vec<Interval<u32>>> = vec![Vec::new(); 7];

    for rule in rules {
        if !(0..=6).contains(&rule.day_of_week) {
            return Err(AppError::Validation(format!("day_of_week {} is out of range 0-6", rule.day_of_week)));
        }
        let window = window_minutes(rule.start_time, rule.end_time);
        if window.is_empty() {
            return Err(AppError::Validation(format!(
                "rule on day {} must start before it ends",
                rule.day_of_week
            )));
        }
        by_day[rule.day_of_week as usize].push(window);
    }

    for (day, windows) in by_day.iter_mut().enumerate() {
        windows.sort_by_key(|w| w.start);
        if windows.windows(2).any(|pair| pair[0].overlaps(&pair[1])) {
            return Err(AppError::Validation(format!("rules on day {} overlap", day)));
        }
    }
    Ok(())
}

pub fn validate_override(entry: &AvailabilityOverride) -> Result<(), AppError> {
    if let Some((start, end)) = entry.kind.window()
        && window_minutes(start, end).is_empty() {
        return Err(AppError::Validation("override window must start before it ends".into()));
    }
    Ok(())
}
