use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, info_span, Instrument};
use crate::domain::models::notification::{STATUS_COMPLETED, STATUS_FAILED};
use crate::error::AppError;
use crate::state::AppState;

const BATCH_SIZE: i32 = 10;

pub async fn start_notification_dispatcher(state: Arc<AppState>) {
    info!("Starting notification dispatcher...");

    loop {
        if let Err(e) = dispatch_pending(&state).await {
            error!("Failed to fetch pending notifications: {:?}", e);
        }
        sleep(state.config.notify_poll_interval).await;
    }
}

/// Claims one batch of outbox rows and hands each to the sink.
/// Returns how many were delivered.
pub async fn dispatch_pending(state: &AppState) -> Result<usize, AppError> {
    let batch = state.notification_repo.claim_pending(BATCH_SIZE).await?;
    let mut delivered = 0;

    for notification in batch {
        let span = info_span!(
            "notification",
            notification_id = %notification.id,
            kind = %notification.kind,
            booking_id = %notification.booking_id
        );

        async {
            match state.notification_sink.deliver(&notification).await {
                Ok(()) => {
                    delivered += 1;
                    if let Err(e) = state.notification_repo.mark(&notification.id, STATUS_COMPLETED, None).await {
                        error!("Failed to mark notification as completed: {:?}", e);
                    }
                }
                Err(e) => {
                    let err_msg = format!("{}", e);
                    error!("Notification delivery failed: {}", err_msg);
                    if let Err(up_err) = state.notification_repo.mark(&notification.id, STATUS_FAILED, Some(err_msg)).await {
                        error!("Failed to mark notification as failed: {:?}", up_err);
                    }
                }
            }
        }
            .instrument(span)
            .await;
    }

    Ok(delivered)
}
