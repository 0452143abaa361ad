use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::models::{
    availability::{AvailabilityOverride, WeeklyAvailabilityRule},
    booking::{
        Actor, Booking, BookingStatus, BookingTransition, DailyCap, NewBookingParams, Requester,
        StatusChange,
    },
    notification::{Notification, NotificationKind, NotificationPayload},
    session_type::SessionType,
};
use crate::domain::ports::{AvailabilityRepository, BookingRepository, SessionTypeRepository};
use crate::domain::services::availability::{day_bounds, Interval};
use crate::domain::services::slots::{compute_slots, validate_start, SlotContext};
use crate::error::{AppError, PolicyRule};

pub const MAX_DATE_RANGE_DAYS: i64 = 62;

/// How a cancellation was requested.
pub enum CancelTarget<'a> {
    Token(&'a str),
    Admin { booking_id: &'a str, principal: &'a str },
}

/// Rules, overrides and ledger entries for a run of provider-local dates.
struct Snapshot {
    rules: Vec<WeeklyAvailabilityRule>,
    overrides: Vec<AvailabilityOverride>,
    bookings: Vec<Booking>,
}

pub struct CoordinatorSettings {
    pub timezone: Tz,
    pub slot_step_minutes: Option<i64>,
    pub public_base_url: String,
}

/// Owns every booking state change. Writers are serialized through one
/// calendar guard; the ledger's conditional writes back that up across processes.
pub struct BookingCoordinator {
    session_types: Arc<dyn SessionTypeRepository>,
    availability: Arc<dyn AvailabilityRepository>,
    bookings: Arc<dyn BookingRepository>,
    settings: CoordinatorSettings,
    calendar_lock: Mutex<()>,
}

impl BookingCoordinator {
    pub fn new(
        session_types: Arc<dyn SessionTypeRepository>,
        availability: Arc<dyn AvailabilityRepository>,
        bookings: Arc<dyn BookingRepository>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            session_types,
            availability,
            bookings,
            settings,
            calendar_lock: Mutex::new(()),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.settings.timezone
    }

    pub fn manage_url(&self, token: &str) -> String {
        format!(
            "{}/api/v1/bookings/manage/{}",
            self.settings.public_base_url.trim_end_matches('/'),
            token
        )
    }

    async fn session_type_by_slug(&self, slug: &str) -> Result<SessionType, AppError> {
        self.session_types
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session type '{}' not found", slug)))
    }

    async fn session_type_of(&self, booking: &Booking) -> Result<SessionType, AppError> {
        self.session_types
            .find_by_id(&booking.session_type_id)
            .await?
            .ok_or_else(|| AppError::InternalWithMsg(format!("booking {} references a missing session type", booking.id)))
    }

    async fn snapshot(&self, first: NaiveDate, last: NaiveDate, exclude: Option<&str>) -> Result<Snapshot, AppError> {
        let tz = self.settings.timezone;
        let (Some(from), Some(to)) = (day_bounds(&tz, first), day_bounds(&tz, last)) else {
            return Err(AppError::Validation(format!("{} cannot be mapped to the provider timezone", first)));
        };

        let rules = self.availability.list_weekly_rules().await?;
        let overrides = self.availability.list_overrides(first, last).await?;
        let mut bookings = self.bookings.list_in_range(from.start, to.end).await?;
        if let Some(id) = exclude {
            bookings.retain(|b| b.id != id);
        }

        Ok(Snapshot { rules, overrides, bookings })
    }

    fn context<'a>(&self, date: NaiveDate, st: &'a SessionType, snap: &'a Snapshot, now: DateTime<Utc>) -> SlotContext<'a> {
        SlotContext {
            date,
            session_type: st,
            rules: &snap.rules,
            overrides: &snap.overrides,
            bookings: &snap.bookings,
            tz: self.settings.timezone,
            step_min: self.settings.slot_step_minutes,
            now,
        }
    }

    fn daily_cap(&self, date: NaiveDate, st: &SessionType) -> Result<DailyCap, AppError> {
        let Interval { start, end } = day_bounds(&self.settings.timezone, date)
            .ok_or_else(|| AppError::Validation(format!("{} cannot be mapped to the provider timezone", date)))?;
        Ok(DailyCap { day_start: start, day_end: end, limit: st.max_per_day })
    }

    fn local(&self, t: DateTime<Utc>) -> String {
        t.with_timezone(&self.settings.timezone).to_rfc3339()
    }

    fn notification(
        &self,
        kind: NotificationKind,
        st: &SessionType,
        booking: &Booking,
        previous: Option<&Booking>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Notification {
        let payload = NotificationPayload {
            booking_id: booking.id.clone(),
            status: booking.status.to_string(),
            session_type: st.name.clone(),
            start_local: self.local(booking.start_time),
            end_local: self.local(booking.end_time),
            timezone: self.settings.timezone.name().to_string(),
            requester: booking.requester(),
            manage_url: self.manage_url(&booking.management_token),
            previous_start_local: previous.map(|p| self.local(p.start_time)),
            reason,
        };
        Notification::new(kind, payload, now)
    }

    pub async fn list_slots(&self, slug: &str, date: NaiveDate, now: DateTime<Utc>) -> Result<Vec<DateTime<Tz>>, AppError> {
        let st = self.session_type_by_slug(slug).await?;
        let snap = self.snapshot(date, date, None).await?;
        Ok(compute_slots(&self.context(date, &st, &snap, now)))
    }

    /// Dates in `start..=end` with at least one bookable slot.
    pub async fn available_dates(
        &self,
        slug: &str,
        start: NaiveDate,
        end: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<NaiveDate>, AppError> {
        if end < start {
            return Err(AppError::Validation("end must not be before start".into()));
        }
        if (end - start).num_days() >= MAX_DATE_RANGE_DAYS {
            return Err(AppError::Validation(format!("date range is limited to {} days", MAX_DATE_RANGE_DAYS)));
        }

        let st = self.session_type_by_slug(slug).await?;
        let snap = self.snapshot(start, end, None).await?;

        Ok(start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !compute_slots(&self.context(*d, &st, &snap, now)).is_empty())
            .collect())
    }

    pub async fn reserve(
        &self,
        slug: &str,
        start: DateTime<Utc>,
        requester: Requester,
        now: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        let st = self.session_type_by_slug(slug).await?;
        if !st.is_active {
            return Err(AppError::PolicyViolation(PolicyRule::InactiveSessionType));
        }

        let date = start.with_timezone(&self.settings.timezone).date_naive();

        let _guard = self.calendar_lock.lock().await;

        let snap = self.snapshot(date, date, None).await?;
        if let Err(e) = validate_start(&self.context(date, &st, &snap, now), start) {
            warn!(session_type = %st.slug, start = %start, "Reservation rejected: {}", e);
            return Err(e);
        }

        let booking = Booking::new(NewBookingParams {
            session_type: &st,
            start,
            requester,
            rescheduled_from: None,
            now,
        });
        let transition = BookingTransition::new(&booking.id, None, booking.status, &Actor::Requester, None, now);
        let notification = self.notification(NotificationKind::BookingReserved, &st, &booking, None, None, now);
        let cap = self.daily_cap(date, &st)?;

        match self.bookings.insert_if_free(&booking, &cap, &transition, &notification).await? {
            Some(saved) => {
                info!(booking_id = %saved.id, status = %saved.status, start = %saved.start_time, "Booking reserved");
                Ok(saved)
            }
            None => {
                warn!(session_type = %st.slug, start = %start, "Reservation lost the race for its slot");
                Err(AppError::SlotUnavailable)
            }
        }
    }

    pub async fn confirm(&self, booking_id: &str, principal: &str, now: DateTime<Utc>) -> Result<Booking, AppError> {
        let _guard = self.calendar_lock.lock().await;

        let booking = self.find(booking_id).await?;
        let change = self.plan(&booking, BookingStatus::Confirmed, None, now)?;
        let st = self.session_type_of(&booking).await?;

        let updated = self
            .transition(&booking, &st, change, &Actor::Admin(principal.to_string()), NotificationKind::BookingConfirmed)
            .await?;
        info!(booking_id = %updated.id, admin_id = %principal, "Booking confirmed");
        Ok(updated)
    }

    /// Cancels a pending or confirmed booking. Bookings already in a terminal
    /// state are returned as they are.
    pub async fn cancel(&self, target: CancelTarget<'_>, reason: Option<String>, now: DateTime<Utc>) -> Result<Booking, AppError> {
        let _guard = self.calendar_lock.lock().await;

        let (booking, actor) = match target {
            CancelTarget::Token(token) => (self.find_by_token(token).await?, Actor::Requester),
            CancelTarget::Admin { booking_id, principal } => {
                (self.find(booking_id).await?, Actor::Admin(principal.to_string()))
            }
        };

        if booking.status.is_terminal() {
            info!(booking_id = %booking.id, status = %booking.status, "Cancel on settled booking ignored");
            return Ok(booking);
        }

        let change = self.plan(&booking, BookingStatus::Cancelled, reason, now)?;
        let st = self.session_type_of(&booking).await?;

        let updated = self.transition(&booking, &st, change, &actor, NotificationKind::BookingCancelled).await?;
        info!(booking_id = %updated.id, actor = %actor, "Booking cancelled");
        Ok(updated)
    }

    pub async fn complete(&self, booking_id: &str, principal: &str, now: DateTime<Utc>) -> Result<Booking, AppError> {
        let _guard = self.calendar_lock.lock().await;

        let booking = self.find(booking_id).await?;
        let change = self.plan(&booking, BookingStatus::Completed, None, now)?;
        if now < booking.end_time {
            return Err(AppError::PolicyViolation(PolicyRule::SessionNotElapsed));
        }
        let st = self.session_type_of(&booking).await?;

        let updated = self
            .transition(&booking, &st, change, &Actor::Admin(principal.to_string()), NotificationKind::BookingCompleted)
            .await?;
        info!(booking_id = %updated.id, admin_id = %principal, "Booking completed");
        Ok(updated)
    }

    /// Moves a confirmed booking to `new_start`. The old record is kept as
    /// `rescheduled` and linked to a new record with its own token.
    pub async fn reschedule(&self, token: &str, new_start: DateTime<Utc>, now: DateTime<Utc>) -> Result<Booking, AppError> {
        let _guard = self.calendar_lock.lock().await;

        let old = self.find_by_token(token).await?;
        if old.status != BookingStatus::Confirmed {
            return Err(AppError::InvalidTransition { from: old.status, to: BookingStatus::Rescheduled });
        }
        let st = self.session_type_of(&old).await?;

        let date = new_start.with_timezone(&self.settings.timezone).date_naive();
        let snap = self.snapshot(date, date, Some(&old.id)).await?;
        if let Err(e) = validate_start(&self.context(date, &st, &snap, now), new_start) {
            warn!(booking_id = %old.id, start = %new_start, "Reschedule rejected: {}", e);
            return Err(e);
        }

        let replacement = Booking::new(NewBookingParams {
            session_type: &st,
            start: new_start,
            requester: old.requester(),
            rescheduled_from: Some(old.id.clone()),
            now,
        });
        let transitions = [
            BookingTransition::new(
                &old.id,
                Some(old.status),
                BookingStatus::Rescheduled,
                &Actor::Requester,
                Some(format!("moved to booking {}", replacement.id)),
                now,
            ),
            BookingTransition::new(&replacement.id, None, replacement.status, &Actor::Requester, None, now),
        ];
        let notification =
            self.notification(NotificationKind::BookingRescheduled, &st, &replacement, Some(&old), None, now);
        let cap = self.daily_cap(date, &st)?;

        match self.bookings.replace_if_free(&old.id, &replacement, &cap, &transitions, &notification).await? {
            Some((_, saved)) => {
                info!(booking_id = %old.id, new_booking_id = %saved.id, start = %saved.start_time, "Booking rescheduled");
                Ok(saved)
            }
            None => {
                warn!(booking_id = %old.id, start = %new_start, "Reschedule lost the race for its slot");
                Err(AppError::SlotUnavailable)
            }
        }
    }

    pub async fn booking_by_token(&self, token: &str) -> Result<(Booking, SessionType), AppError> {
        let booking = self.find_by_token(token).await?;
        let st = self.session_type_of(&booking).await?;
        Ok((booking, st))
    }

    pub async fn history(&self, booking_id: &str) -> Result<Vec<BookingTransition>, AppError> {
        let booking = self.find(booking_id).await?;
        self.bookings.list_transitions(&booking.id).await
    }

    async fn find(&self, booking_id: &str) -> Result<Booking, AppError> {
        self.bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", booking_id)))
    }

    async fn find_by_token(&self, token: &str) -> Result<Booking, AppError> {
        self.bookings.find_by_token(token).await?.ok_or(AppError::InvalidManagementToken)
    }

    fn plan(&self, booking: &Booking, to: BookingStatus, reason: Option<String>, now: DateTime<Utc>) -> Result<StatusChange, AppError> {
        if !booking.status.can_transition_to(to) {
            return Err(AppError::InvalidTransition { from: booking.status, to });
        }
        let cancelling = to == BookingStatus::Cancelled;
        Ok(StatusChange {
            from: booking.status,
            to,
            cancelled_reason: if cancelling { reason } else { None },
            cancelled_at: cancelling.then_some(now),
            at: now,
        })
    }

    async fn transition(
        &self,
        booking: &Booking,
        st: &SessionType,
        change: StatusChange,
        actor: &Actor,
        kind: NotificationKind,
    ) -> Result<Booking, AppError> {
        let record = BookingTransition::new(
            &booking.id,
            Some(change.from),
            change.to,
            actor,
            change.cancelled_reason.clone(),
            change.at,
        );

        let mut after = booking.clone();
        after.status = change.to;
        let notification = self.notification(kind, st, &after, None, change.cancelled_reason.clone(), change.at);

        self.bookings
            .apply_transition(&booking.id, &change, &record, &notification)
            .await?
            .ok_or(AppError::InvalidTransition { from: booking.status, to: change.to })
    }
}
