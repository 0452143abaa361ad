use crate::domain::models::{booking::{Booking, BookingStatus}, session_type::SessionType};
use icalendar::{Calendar, Component, Event as IcalEvent, EventLike, EventStatus};

/// Generates an iCalendar (.ics) document for one booking.
pub fn generate_ics(session_type: &SessionType, booking: &Booking, manage_url: &str) -> String {
    let mut calendar = Calendar::new();

    let status = match booking.status {
        BookingStatus::Pending => EventStatus::Tentative,
        BookingStatus::Confirmed | BookingStatus::Completed => EventStatus::Confirmed,
        BookingStatus::Cancelled | BookingStatus::Rescheduled => EventStatus::Cancelled,
    };

    let description = match &session_type.description {
        Some(text) => format!("{}\n\nManage your booking: {}", text, manage_url),
        None => format!("Manage your booking: {}", manage_url),
    };

    let ical_event = IcalEvent::new()
        .summary(&session_type.name)
        .description(&description)
        .starts(booking.start_time)
        .ends(booking.end_time)
        .status(status)
        .add_property("URL", manage_url)
        .uid(&booking.id)
        .done();

    calendar.push(ical_event);
    calendar.to_string()
}
