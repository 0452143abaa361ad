use std::sync::Arc;
use crate::domain::ports::{
    AvailabilityRepository, BookingRepository, Clock, NotificationRepository, NotificationSink,
    SessionTypeRepository,
};
use crate::domain::services::coordinator::BookingCoordinator;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub session_type_repo: Arc<dyn SessionTypeRepository>,
    pub availability_repo: Arc<dyn AvailabilityRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub notification_repo: Arc<dyn NotificationRepository>,
    pub notification_sink: Arc<dyn NotificationSink>,
    pub coordinator: Arc<BookingCoordinator>,
    pub clock: Arc<dyn Clock>,
}
