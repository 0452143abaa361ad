use crate::domain::models::{
    availability::{AvailabilityOverride, WeeklyAvailabilityRule},
    booking::{Booking, BookingFilter, BookingTransition, DailyCap, StatusChange},
    notification::Notification,
    session_type::SessionType,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

#[async_trait]
pub trait SessionTypeRepository: Send + Sync {
    async fn create(&self, session_type: &SessionType) -> Result<SessionType, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<SessionType>, AppError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<SessionType>, AppError>;
    async fn list(&self, active_only: bool) -> Result<Vec<SessionType>, AppError>;
    async fn update(&self, session_type: &SessionType) -> Result<SessionType, AppError>;
    /// Refused with `Conflict` while any booking references the type.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    async fn list_weekly_rules(&self) -> Result<Vec<WeeklyAvailabilityRule>, AppError>;
    /// Swaps the whole weekly schedule in one transaction.
    async fn replace_weekly_rules(&self, rules: &[WeeklyAvailabilityRule]) -> Result<Vec<WeeklyAvailabilityRule>, AppError>;
    /// Overrides dated within `start..=end`.
    async fn list_overrides(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<AvailabilityOverride>, AppError>;
    async fn create_override(&self, entry: &AvailabilityOverride) -> Result<AvailabilityOverride, AppError>;
    async fn delete_override(&self, id: &str) -> Result<(), AppError>;
}

/// The ledger. Writes that can collide are conditional: they return `None`
/// instead of committing when the calendar no longer allows them.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Inserts `booking` unless an active booking's blocked interval intersects
    /// its own, or the daily cap for its type is already reached.
    async fn insert_if_free(
        &self,
        booking: &Booking,
        cap: &DailyCap,
        transition: &BookingTransition,
        notification: &Notification,
    ) -> Result<Option<Booking>, AppError>;

    /// Marks `old_id` rescheduled and inserts `replacement` in one transaction.
    /// `Ok(None)` when the replacement's interval is taken; nothing is changed then.
    async fn replace_if_free(
        &self,
        old_id: &str,
        replacement: &Booking,
        cap: &DailyCap,
        transitions: &[BookingTransition],
        notification: &Notification,
    ) -> Result<Option<(Booking, Booking)>, AppError>;

    /// Applies `change` only if the booking is still in `change.from`.
    async fn apply_transition(
        &self,
        booking_id: &str,
        change: &StatusChange,
        transition: &BookingTransition,
        notification: &Notification,
    ) -> Result<Option<Booking>, AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;
    async fn find_by_token(&self, token: &str) -> Result<Option<Booking>, AppError>;
    /// Pending, confirmed and completed bookings whose blocked interval intersects `[start, end)`.
    async fn list_in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError>;
    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError>;
    async fn list_transitions(&self, booking_id: &str) -> Result<Vec<BookingTransition>, AppError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Moves up to `limit` pending rows to PROCESSING and returns them.
    async fn claim_pending(&self, limit: i32) -> Result<Vec<Notification>, AppError>;
    async fn mark(&self, id: &str, status: &str, error_message: Option<String>) -> Result<(), AppError>;
    async fn list_by_booking(&self, booking_id: &str) -> Result<Vec<Notification>, AppError>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), AppError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
