use crate::domain::{models::session_type::SessionType, ports::SessionTypeRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{PgPool, Row};

pub struct PostgresSessionTypeRepo {
    pool: PgPool,
}

impl PostgresSessionTypeRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl SessionTypeRepository for PostgresSessionTypeRepo {
    async fn create(&self, st: &SessionType) -> Result<SessionType, AppError> {
        sqlx::query_as::<_, SessionType>(
            r#"INSERT INTO session_types (id, name, slug, description, duration_min, buffer_before_min, buffer_after_min,
                   min_notice_hours, max_advance_days, max_per_day, requires_confirmation, is_active, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
               RETURNING *"#
        )
            .bind(&st.id).bind(&st.name).bind(&st.slug).bind(&st.description)
            .bind(st.duration_min).bind(st.buffer_before_min).bind(st.buffer_after_min)
            .bind(st.min_notice_hours).bind(st.max_advance_days).bind(st.max_per_day)
            .bind(st.requires_confirmation).bind(st.is_active).bind(st.created_at).bind(st.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<SessionType>, AppError> {
        sqlx::query_as::<_, SessionType>("SELECT * FROM session_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<SessionType>, AppError> {
        sqlx::query_as::<_, SessionType>("SELECT * FROM session_types WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self, active_only: bool) -> Result<Vec<SessionType>, AppError> {
        sqlx::query_as::<_, SessionType>(
            "SELECT * FROM session_types WHERE ($1 = FALSE OR is_active = TRUE) ORDER BY name ASC"
        )
            .bind(active_only)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update(&self, st: &SessionType) -> Result<SessionType, AppError> {
        sqlx::query_as::<_, SessionType>(
            r#"UPDATE session_types SET name=$1, slug=$2, description=$3, duration_min=$4, buffer_before_min=$5, buffer_after_min=$6,
                   min_notice_hours=$7, max_advance_days=$8, max_per_day=$9, requires_confirmation=$10, is_active=$11, updated_at=$12
               WHERE id=$13
               RETURNING *"#
        )
            .bind(&st.name).bind(&st.slug).bind(&st.description)
            .bind(st.duration_min).bind(st.buffer_before_min).bind(st.buffer_after_min)
            .bind(st.min_notice_hours).bind(st.max_advance_days).bind(st.max_per_day)
            .bind(st.requires_confirmation).bind(st.is_active).bind(st.updated_at)
            .bind(&st.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Session type not found".into()))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let referenced = sqlx::query("SELECT COUNT(*) as count FROM bookings WHERE session_type_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .get::<i64, _>("count");
        if referenced > 0 {
            return Err(AppError::Conflict("Session type has bookings; deactivate it instead".into()));
        }

        let result = sqlx::query("DELETE FROM session_types WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Session type not found".into()));
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }
}
