use crate::domain::{models::notification::Notification, ports::NotificationSink};
use crate::error::AppError;
use async_trait::async_trait;
use tracing::info;

/// Fallback sink used when no webhook is configured.
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), AppError> {
        let payload = &notification.payload.0;
        info!(
            notification_id = %notification.id,
            kind = %notification.kind,
            booking_id = %notification.booking_id,
            start = %payload.start_local,
            requester = %payload.requester.email,
            "Notification emitted"
        );
        Ok(())
    }
}
