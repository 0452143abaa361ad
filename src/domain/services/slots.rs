use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

use crate::domain::models::{
    availability::{AvailabilityOverride, WeeklyAvailabilityRule},
    booking::Booking,
    session_type::SessionType,
};
use crate::domain::services::availability::{
    day_bounds, resolve_day_windows, subtract, windows_to_utc, Interval,
};
use crate::error::{AppError, PolicyRule};

/// Everything the slot walk needs for one provider-local date.
pub struct SlotContext<'a> {
    pub date: NaiveDate,
    pub session_type: &'a SessionType,
    pub rules: &'a [WeeklyAvailabilityRule],
    pub overrides: &'a [AvailabilityOverride],
    /// Ledger snapshot covering the day. Bookings of any type and status may be passed.
    pub bookings: &'a [Booking],
    pub tz: Tz,
    /// Explicit step between candidate starts. Defaults to the session type's footprint.
    pub step_min: Option<i64>,
    pub now: DateTime<Utc>,
}

fn floor_to_minute(t: DateTime<Utc>) -> DateTime<Utc> {
    t - Duration::seconds(t.second() as i64) - Duration::nanoseconds(t.nanosecond() as i64)
}

impl SlotContext<'_> {
    fn earliest(&self) -> DateTime<Utc> {
        self.session_type.earliest_start(floor_to_minute(self.now))
    }

    fn latest(&self) -> DateTime<Utc> {
        self.session_type.latest_start(floor_to_minute(self.now))
    }

    fn step(&self) -> Duration {
        let minutes = self
            .step_min
            .filter(|s| *s > 0)
            .unwrap_or_else(|| self.session_type.footprint_min());
        Duration::minutes(minutes)
    }

    /// Bookings of this type that start on the date and still count toward the cap.
    pub fn booked_today(&self) -> usize {
        self.bookings
            .iter()
            .filter(|b| b.session_type_id == self.session_type.id)
            .filter(|b| b.status.counts_toward_daily_cap())
            .filter(|b| b.start_time.with_timezone(&self.tz).date_naive() == self.date)
            .count()
    }

    pub fn cap_reached(&self) -> bool {
        match self.session_type.max_per_day {
            Some(limit) => self.booked_today() >= limit.max(0) as usize,
            None => false,
        }
    }

    fn busy(&self) -> Vec<Interval<DateTime<Utc>>> {
        self.bookings
            .iter()
            .filter(|b| b.status.occupies_calendar())
            .map(|b| Interval::new(b.blocked_start, b.blocked_end))
            .collect()
    }
}

/// Bookable starts for `ctx.date`, ascending, in the provider timezone.
pub fn compute_slots(ctx: &SlotContext<'_>) -> Vec<DateTime<Tz>> {
    let st = ctx.session_type;
    if !st.is_active {
        return Vec::new();
    }

    let Some(day) = day_bounds(&ctx.tz, ctx.date) else {
        return Vec::new();
    };
    let (earliest, latest) = (ctx.earliest(), ctx.latest());
    if day.end <= earliest || day.start > latest {
        return Vec::new();
    }

    if ctx.cap_reached() {
        return Vec::new();
    }

    let windows = resolve_day_windows(ctx.date, ctx.rules, ctx.overrides);
    let open = windows_to_utc(&ctx.tz, ctx.date, &windows);
    let free = subtract(&open, &ctx.busy());

    let (before, duration, after) = (st.buffer_before(), st.duration(), st.buffer_after());
    let step = ctx.step();

    let mut starts = Vec::new();
    for window in free {
        let mut start = window.start + before;
        while start + duration + after <= window.end {
            if start >= earliest && start <= latest {
                starts.push(start);
            }
            start += step;
        }
    }

    starts.sort();
    starts.dedup();
    starts.into_iter().map(|s| s.with_timezone(&ctx.tz)).collect()
}

/// Checks one requested start and names the first rule it breaks.
pub fn validate_start(ctx: &SlotContext<'_>, start: DateTime<Utc>) -> Result<(), AppError> {
    if !ctx.session_type.is_active {
        return Err(AppError::PolicyViolation(PolicyRule::InactiveSessionType));
    }
    if start < ctx.earliest() {
        return Err(AppError::PolicyViolation(PolicyRule::MinimumNotice));
    }
    if start > ctx.latest() {
        return Err(AppError::PolicyViolation(PolicyRule::MaximumAdvance));
    }
    if ctx.cap_reached() {
        return Err(AppError::PolicyViolation(PolicyRule::DailyCap));
    }

    if compute_slots(ctx).iter().any(|s| *s == start) {
        Ok(())
    } else {
        Err(AppError::SlotUnavailable)
    }
}
