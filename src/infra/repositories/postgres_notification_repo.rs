use crate::domain::{models::notification::Notification, ports::NotificationRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresNotificationRepo {
    pool: PgPool,
}

impl PostgresNotificationRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepo {
    async fn claim_pending(&self, limit: i32) -> Result<Vec<Notification>, AppError> {
        sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET status = 'PROCESSING'
            WHERE id IN (
                SELECT id
                FROM notifications
                WHERE status = 'PENDING'
                ORDER BY created_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#
        )
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn mark(&self, id: &str, status: &str, error_message: Option<String>) -> Result<(), AppError> {
        sqlx::query("UPDATE notifications SET status = $1, error_message = $2 WHERE id = $3")
            .bind(status)
            .bind(error_message)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn list_by_booking(&self, booking_id: &str) -> Result<Vec<Notification>, AppError> {
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE booking_id = $1 ORDER BY created_at ASC"
        )
            .bind(booking_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
