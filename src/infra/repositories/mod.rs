pub mod sqlite_session_type_repo;
pub mod sqlite_availability_repo;
pub mod sqlite_booking_repo;
pub mod sqlite_notification_repo;

pub mod postgres_session_type_repo;
pub mod postgres_availability_repo;
pub mod postgres_booking_repo;
pub mod postgres_notification_repo;
