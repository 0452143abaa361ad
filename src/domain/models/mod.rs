pub mod auth;
pub mod availability;
pub mod booking;
pub mod notification;
pub mod session_type;
