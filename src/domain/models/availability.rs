use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// `HH:MM` wire format for provider-local times of day.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(value: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time of day '{}', expected HH:MM", raw)))
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct WeeklyAvailabilityRule {
    pub id: String,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: i32,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

impl WeeklyAvailabilityRule {
    pub fn new(day_of_week: i32, start_time: NaiveTime, end_time: NaiveTime, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            day_of_week,
            start_time,
            end_time,
            created_at: now,
        }
    }
}

/// What an override does to the recurring availability of its date.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverrideKind {
    FullBlock,
    AddWindow {
        #[serde(with = "hhmm")]
        start: NaiveTime,
        #[serde(with = "hhmm")]
        end: NaiveTime,
    },
    RemoveWindow {
        #[serde(with = "hhmm")]
        start: NaiveTime,
        #[serde(with = "hhmm")]
        end: NaiveTime,
    },
}

impl OverrideKind {
    pub fn tag(&self) -> &'static str {
        match self {
            OverrideKind::FullBlock => "full_block",
            OverrideKind::AddWindow { .. } => "add_window",
            OverrideKind::RemoveWindow { .. } => "remove_window",
        }
    }

    pub fn window(&self) -> Option<(NaiveTime, NaiveTime)> {
        match *self {
            OverrideKind::FullBlock => None,
            OverrideKind::AddWindow { start, end } | OverrideKind::RemoveWindow { start, end } => Some((start, end)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AvailabilityOverride {
    pub id: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub kind: OverrideKind,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AvailabilityOverride {
    pub fn new(date: NaiveDate, kind: OverrideKind, note: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date,
            kind,
            note,
            created_at: now,
        }
    }
}

/// Storage shape of an override: the variant tag plus nullable window bounds.
#[derive(Debug, FromRow)]
pub struct OverrideRow {
    pub id: String,
    pub date: NaiveDate,
    pub kind: String,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<OverrideRow> for AvailabilityOverride {
    type Error = String;

    fn try_from(row: OverrideRow) -> Result<Self, Self::Error> {
        let kind = match (row.kind.as_str(), row.start_time, row.end_time) {
            ("full_block", _, _) => OverrideKind::FullBlock,
            ("add_window", Some(start), Some(end)) => OverrideKind::AddWindow { start, end },
            ("remove_window", Some(start), Some(end)) => OverrideKind::RemoveWindow { start, end },
            (other, _, _) => return Err(format!("malformed override {} of kind '{}'", row.id, other)),
        };

        Ok(Self {
            id: row.id,
            date: row.date,
            kind,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_kind_round_trips_through_tagged_json() {
        let json = serde_json::json!({
            "id": "o1",
            "date": "2024-01-08",
            "kind": "add_window",
            "start": "13:00",
            "end": "15:30",
            "note": null,
            "created_at": "2024-01-01T00:00:00Z"
        });

        let parsed: AvailabilityOverride = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.kind, OverrideKind::AddWindow {
            start: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
        });

        let back = serde_json::to_value(&parsed).unwrap();
        assert_eq!(back["kind"], "add_window");
        assert_eq!(back["start"], "13:00");
    }

    #[test]
    fn malformed_rows_are_rejected() {
        let row = OverrideRow {
            id: "o2".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            kind: "remove_window".into(),
            start_time: None,
            end_time: None,
            note: None,
            created_at: Utc::now(),
        };
        assert!(AvailabilityOverride::try_from(row).is_err());
    }
}
