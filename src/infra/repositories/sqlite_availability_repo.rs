use crate::domain::{
    models::availability::{AvailabilityOverride, OverrideRow, WeeklyAvailabilityRule},
    ports::AvailabilityRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;

pub struct SqliteAvailabilityRepo {
    pool: SqlitePool,
}

impl SqliteAvailabilityRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }
}

fn into_override(row: OverrideRow) -> Result<AvailabilityOverride, AppError> {
    AvailabilityOverride::try_from(row).map_err(AppError::InternalWithMsg)
}

#[async_trait]
impl AvailabilityRepository for SqliteAvailabilityRepo {
    async fn list_weekly_rules(&self) -> Result<Vec<WeeklyAvailabilityRule>, AppError> {
        sqlx::query_as::<_, WeeklyAvailabilityRule>(
            "SELECT * FROM weekly_availability_rules ORDER BY day_of_week ASC, start_time ASC"
        )
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn replace_weekly_rules(&self, rules: &[WeeklyAvailabilityRule]) -> Result<Vec<WeeklyAvailabilityRule>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("DELETE FROM weekly_availability_rules")
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        for rule in rules {
            sqlx::query(
                "INSERT INTO weekly_availability_rules (id, day_of_week, start_time, end_time, created_at) VALUES (?, ?, ?, ?, ?)"
            )
                .bind(&rule.id)
                .bind(rule.day_of_week)
                .bind(rule.start_time)
                .bind(rule.end_time)
                .bind(rule.created_at)
                .execute(&mut *tx)
                .await
                .map_err(AppError::Database)?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        self.list_weekly_rules().await
    }

    async fn list_overrides(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<AvailabilityOverride>, AppError> {
        sqlx::query_as::<_, OverrideRow>(
            "SELECT * FROM availability_overrides WHERE date >= ? AND date <= ? ORDER BY date ASC, created_at ASC"
        )
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?
            .into_iter()
            .map(into_override)
            .collect()
    }

    async fn create_override(&self, entry: &AvailabilityOverride) -> Result<AvailabilityOverride, AppError> {
        let window = entry.kind.window();
        let row = sqlx::query_as::<_, OverrideRow>(
            r#"INSERT INTO availability_overrides (id, date, kind, start_time, end_time, note, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               RETURNING *"#
        )
            .bind(&entry.id)
            .bind(entry.date)
            .bind(entry.kind.tag())
            .bind(window.map(|(start, _)| start))
            .bind(window.map(|(_, end)| end))
            .bind(&entry.note)
            .bind(entry.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)?;
        into_override(row)
    }

    async fn delete_override(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM availability_overrides WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Override not found".into()));
        }
        Ok(())
    }
}
