use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;

use crate::domain::models::{booking::Booking, session_type::SessionType};

#[derive(Serialize)]
pub struct SlotsResponse {
    pub date: NaiveDate,
    pub timezone: String,
    pub slots: Vec<String>,
}

impl SlotsResponse {
    pub fn new(date: NaiveDate, tz: Tz, slots: &[DateTime<Tz>]) -> Self {
        Self {
            date,
            timezone: tz.name().to_string(),
            slots: slots.iter().map(|s| s.to_rfc3339()).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct AvailableDatesResponse {
    pub dates: Vec<NaiveDate>,
}

/// Booking as handed back to the requester, with its management link.
#[derive(Serialize)]
pub struct BookingResponse {
    #[serde(flatten)]
    pub booking: Booking,
    pub manage_url: String,
}

#[derive(Serialize)]
pub struct ManagedBookingResponse {
    pub booking: Booking,
    pub session_type: SessionType,
    pub manage_url: String,
}
