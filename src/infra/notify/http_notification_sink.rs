use crate::domain::{models::notification::Notification, ports::NotificationSink};
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::error;

use crate::domain::models::notification::NotificationPayload;

/// Posts each notification as JSON to a webhook owned by the delivery service.
pub struct HttpNotificationSink {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpNotificationSink {
    pub fn new(url: String, token: Option<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build webhook client: {}", e)))?;
        Ok(Self { client, url, token })
    }
}

#[derive(Serialize)]
struct WebhookBody<'a> {
    id: &'a str,
    kind: &'a str,
    created_at: String,
    data: &'a NotificationPayload,
}

#[async_trait]
impl NotificationSink for HttpNotificationSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), AppError> {
        let body = WebhookBody {
            id: &notification.id,
            kind: &notification.kind,
            created_at: notification.created_at.to_rfc3339(),
            data: &notification.payload.0,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let res = request.send().await.map_err(|e| {
            let msg = format!("Notification webhook connection error: {}", e);
            error!("{}", msg);
            AppError::InternalWithMsg(msg)
        })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Notification webhook failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::InternalWithMsg(msg));
        }

        Ok(())
    }
}
