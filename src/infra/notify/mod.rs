pub mod http_notification_sink;
pub mod log_notification_sink;
