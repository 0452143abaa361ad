use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::cmp::max;

use crate::domain::models::availability::{AvailabilityOverride, OverrideKind, WeeklyAvailabilityRule};

pub const MINUTES_PER_DAY: u32 = 1440;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval<T> {
    pub start: T,
    pub end: T,
}

impl<T: Ord + Copy> Interval<T> {
    pub fn new(start: T, end: T) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn overlaps(&self, other: &Interval<T>) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Sorts, drops empty intervals and coalesces overlapping or touching ones.
pub fn normalize<T: Ord + Copy>(mut intervals: Vec<Interval<T>>) -> Vec<Interval<T>> {
    intervals.retain(|i| !i.is_empty());
    intervals.sort_by(|a, b| a.start.cmp(&b.start));

    let mut merged: Vec<Interval<T>> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end => last.end = max(last.end, interval.end),
            _ => merged.push(interval),
        }
    }
    merged
}

/// `base` minus every interval of `cut`. Result is normalized.
pub fn subtract<T: Ord + Copy>(base: &[Interval<T>], cut: &[Interval<T>]) -> Vec<Interval<T>> {
    let cuts = normalize(cut.to_vec());
    let mut out = Vec::new();

    for window in normalize(base.to_vec()) {
        let mut cursor = window.start;
        for c in &cuts {
            if c.end <= cursor || c.start >= window.end {
                continue;
            }
            if c.start > cursor {
                out.push(Interval::new(cursor, c.start));
            }
            cursor = max(cursor, c.end);
            if cursor >= window.end {
                break;
            }
        }
        if cursor < window.end {
            out.push(Interval::new(cursor, window.end));
        }
    }
    out
}

pub fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// A window ending at 23:59 or 00:00 runs to the end of the day.
pub fn window_end_minute(time: NaiveTime) -> u32 {
    match minute_of_day(time) {
        0 | 1439 => MINUTES_PER_DAY,
        m => m,
    }
}

pub fn window_minutes(start: NaiveTime, end: NaiveTime) -> Interval<u32> {
    Interval::new(minute_of_day(start), window_end_minute(end))
}

/// Weekday index used by weekly rules: 0 = Sunday .. 6 = Saturday.
pub fn day_of_week(date: NaiveDate) -> i32 {
    date.weekday().num_days_from_sunday() as i32
}

/// Provider-local open windows for `date`, in minutes from local midnight.
///
/// A full block on the date empties the day. Otherwise added windows are
/// unioned with the weekly rules for that weekday and removed windows are
/// carved out of the result.
pub fn resolve_day_windows(
    date: NaiveDate,
    rules: &[WeeklyAvailabilityRule],
    overrides: &[AvailabilityOverride],
) -> Vec<Interval<u32>> {
    let todays: Vec<&AvailabilityOverride> = overrides.iter().filter(|o| o.date == date).collect();

    if todays.iter().any(|o| o.kind == OverrideKind::FullBlock) {
        return Vec::new();
    }

    let weekday = day_of_week(date);
    let mut open: Vec<Interval<u32>> = rules
        .iter()
        .filter(|r| r.day_of_week == weekday)
        .map(|r| window_minutes(r.start_time, r.end_time))
        .collect();

    let mut removed = Vec::new();
    for o in todays {
        match o.kind {
            OverrideKind::AddWindow { start, end } => open.push(window_minutes(start, end)),
            OverrideKind::RemoveWindow { start, end } => removed.push(window_minutes(start, end)),
            OverrideKind::FullBlock => {}
        }
    }

    subtract(&normalize(open), &removed)
}

/// Maps a provider-local minute of `date` to an instant. Local times inside a
/// DST gap move forward by an hour; ambiguous local times take the earlier instant.
pub fn local_instant(tz: &Tz, date: NaiveDate, minute: u32) -> Option<DateTime<Utc>> {
    let naive = date.and_time(NaiveTime::MIN) + Duration::minutes(minute as i64);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|t| t.with_timezone(&Utc))
}

/// The provider-local calendar day as a UTC interval.
pub fn day_bounds(tz: &Tz, date: NaiveDate) -> Option<Interval<DateTime<Utc>>> {
    Some(Interval::new(
        local_instant(tz, date, 0)?,
        local_instant(tz, date, MINUTES_PER_DAY)?,
    ))
}

pub fn windows_to_utc(tz: &Tz, date: NaiveDate, windows: &[Interval<u32>]) -> Vec<Interval<DateTime<Utc>>> {
    let converted = windows
        .iter()
        .filter_map(|w| Some(Interval::new(local_instant(tz, date, w.start)?, local_instant(tz, date, w.end)?)))
        .collect();
    normalize(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
    }

    fn rule(day: i32, start: NaiveTime, end: NaiveTime) -> WeeklyAvailabilityRule {
        WeeklyAvailabilityRule::new(day, start, end, Utc::now())
    }

    fn on(date: NaiveDate, kind: OverrideKind) -> AvailabilityOverride {
        AvailabilityOverride::new(date, kind, None, Utc::now())
    }

    #[test]
    fn normalize_coalesces_touching_and_overlapping() {
        let merged = normalize(vec![
            Interval::new(600, 720),
            Interval::new(540, 600),
            Interval::new(700, 800),
            Interval::new(900, 900),
        ]);
        assert_eq!(merged, vec![Interval::new(540, 800)]);
    }

    #[test]
    fn subtract_splits_windows() {
        let left = subtract(
            &[Interval::new(540, 720)],
            &[Interval::new(600, 630), Interval::new(700, 800)],
        );
        assert_eq!(left, vec![Interval::new(540, 600), Interval::new(630, 700)]);
    }

    #[test]
    fn sunday_is_day_zero() {
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(day_of_week(sunday), 0);
        assert_eq!(day_of_week(monday()), 1);
    }

    #[test]
    fn full_block_wins_over_everything() {
        let rules = vec![rule(1, t(9, 0), t(12, 0))];
        let overrides = vec![
            on(monday(), OverrideKind::AddWindow { start: t(14, 0), end: t(16, 0) }),
            on(monday(), OverrideKind::FullBlock),
        ];
        assert!(resolve_day_windows(monday(), &rules, &overrides).is_empty());
    }

    #[test]
    fn add_window_opens_a_day_without_rules() {
        let saturday = NaiveDate::from_ymd_opt(2024, 1, 13).unwrap();
        let rules = vec![rule(1, t(9, 0), t(12, 0))];
        let overrides = vec![on(saturday, OverrideKind::AddWindow { start: t(10, 0), end: t(11, 0) })];
        assert_eq!(resolve_day_windows(saturday, &rules, &overrides), vec![Interval::new(600, 660)]);
    }

    #[test]
    fn remove_window_carves_out_of_rules() {
        let rules = vec![rule(1, t(9, 0), t(17, 0))];
        let overrides = vec![on(monday(), OverrideKind::RemoveWindow { start: t(12, 0), end: t(13, 0) })];
        assert_eq!(
            resolve_day_windows(monday(), &rules, &overrides),
            vec![Interval::new(540, 720), Interval::new(780, 1020)]
        );
    }

    #[test]
    fn overrides_for_other_dates_are_ignored() {
        let rules = vec![rule(1, t(9, 0), t(12, 0))];
        let overrides = vec![on(monday().succ_opt().unwrap(), OverrideKind::FullBlock)];
        assert_eq!(resolve_day_windows(monday(), &rules, &overrides), vec![Interval::new(540, 720)]);
    }

    #[test]
    fn late_window_end_means_end_of_day() {
        assert_eq!(window_minutes(t(20, 0), t(23, 59)), Interval::new(1200, 1440));
        assert_eq!(window_minutes(t(20, 0), t(0, 0)), Interval::new(1200, 1440));
    }

    #[test]
    fn dst_gap_moves_forward() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        let spring = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        // 02:30 does not exist locally; 03:30 CEST is 01:30 UTC.
        let instant = local_instant(&tz, spring, 150).unwrap();
        assert_eq!(instant.to_rfc3339(), "2024-03-31T01:30:00+00:00");

        let bounds = day_bounds(&tz, spring).unwrap();
        assert_eq!(bounds.end - bounds.start, Duration::hours(23));
    }

    #[test]
    fn ambiguous_local_time_takes_the_earlier_instant() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        let autumn = NaiveDate::from_ymd_opt(2024, 10, 27).unwrap();
        let instant = local_instant(&tz, autumn, 150).unwrap();
        assert_eq!(instant.to_rfc3339(), "2024-10-27T00:30:00+00:00");
    }
}
