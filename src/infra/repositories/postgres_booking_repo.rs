use crate::domain::{
    models::{
        booking::{Booking, BookingFilter, BookingTransition, DailyCap, StatusChange},
        notification::Notification,
    },
    ports::BookingRepository,
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

/// Key of the transaction-scoped advisory lock serializing calendar writes
/// across processes sharing one database.
const CALENDAR_LOCK_KEY: i64 = 0x5C4E_D01E;

const INSERT_IF_FREE: &str = r#"
    INSERT INTO bookings (id, session_type_id, start_time, end_time, blocked_start, blocked_end, status,
        requester_name, requester_email, requester_phone, requester_note, management_token,
        rescheduled_from, rescheduled_to, cancelled_reason, cancelled_at, created_at, updated_at)
    SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18
    WHERE NOT EXISTS (
        SELECT 1 FROM bookings
        WHERE status IN ('pending', 'confirmed', 'completed') AND blocked_start < $6 AND blocked_end > $5
    )
    AND (
        SELECT COUNT(*) FROM bookings
        WHERE session_type_id = $2 AND status IN ('pending', 'confirmed', 'completed')
          AND start_time >= $19 AND start_time < $20
    ) < $21
    RETURNING *
"#;

pub struct PostgresBookingRepo {
    pool: PgPool,
}

impl PostgresBookingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn lock_calendar(conn: &mut PgConnection) -> Result<(), AppError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(CALENDAR_LOCK_KEY)
        .execute(&mut *conn)
        .await
        .map_err(AppError::Database)?;
    Ok(())
}

async fn insert_conditional(conn: &mut PgConnection, b: &Booking, cap: &DailyCap) -> Result<Option<Booking>, AppError> {
    sqlx::query_as::<_, Booking>(INSERT_IF_FREE)
        .bind(&b.id).bind(&b.session_type_id).bind(b.start_time).bind(b.end_time)
        .bind(b.blocked_start).bind(b.blocked_end).bind(b.status.as_str())
        .bind(&b.requester_name).bind(&b.requester_email).bind(&b.requester_phone).bind(&b.requester_note)
        .bind(&b.management_token).bind(&b.rescheduled_from).bind(&b.rescheduled_to)
        .bind(&b.cancelled_reason).bind(b.cancelled_at).bind(b.created_at).bind(b.updated_at)
        .bind(cap.day_start).bind(cap.day_end).bind(cap.limit_or_max())
        .fetch_optional(&mut *conn)
        .await
        .map_err(AppError::Database)
}

async fn record(conn: &mut PgConnection, transition: &BookingTransition) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO booking_transitions (id, booking_id, from_status, to_status, actor, reason, occurred_at) VALUES ($1, $2, $3, $4, $5, $6, $7)"
    )
        .bind(&transition.id).bind(&transition.booking_id).bind(&transition.from_status).bind(&transition.to_status)
        .bind(&transition.actor).bind(&transition.reason).bind(transition.occurred_at)
        .execute(&mut *conn)
        .await
        .map_err(AppError::Database)?;
    Ok(())
}

async fn enqueue(conn: &mut PgConnection, n: &Notification) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO notifications (id, kind, booking_id, payload, status, error_message, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)"
    )
        .bind(&n.id).bind(&n.kind).bind(&n.booking_id).bind(&n.payload)
        .bind(&n.status).bind(&n.error_message).bind(n.created_at)
        .execute(&mut *conn)
        .await
        .map_err(AppError::Database)?;
    Ok(())
}

#[async_trait]
impl BookingRepository for PostgresBookingRepo {
    async fn insert_if_free(
        &self,
        booking: &Booking,
        cap: &DailyCap,
        transition: &BookingTransition,
        notification: &Notification,
    ) -> Result<Option<Booking>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        lock_calendar(&mut tx).await?;

        let Some(created) = insert_conditional(&mut tx, booking, cap).await? else {
            return Ok(None);
        };
        record(&mut tx, transition).await?;
        enqueue(&mut tx, notification).await?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(Some(created))
    }

    async fn replace_if_free(
        &self,
        old_id: &str,
        replacement: &Booking,
        cap: &DailyCap,
        transitions: &[BookingTransition],
        notification: &Notification,
    ) -> Result<Option<(Booking, Booking)>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        lock_calendar(&mut tx).await?;

        let old = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = 'rescheduled', rescheduled_to = $1, updated_at = $2 WHERE id = $3 AND status = 'confirmed' RETURNING *"
        )
            .bind(&replacement.id)
            .bind(replacement.created_at)
            .bind(old_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::Conflict("Booking changed while it was being rescheduled".into()))?;

        let Some(created) = insert_conditional(&mut tx, replacement, cap).await? else {
            return Ok(None);
        };
        for transition in transitions {
            record(&mut tx, transition).await?;
        }
        enqueue(&mut tx, notification).await?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(Some((old, created)))
    }

    async fn apply_transition(
        &self,
        booking_id: &str,
        change: &StatusChange,
        transition: &BookingTransition,
        notification: &Notification,
    ) -> Result<Option<Booking>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let updated = sqlx::query_as::<_, Booking>(
            r#"UPDATE bookings
               SET status = $1, cancelled_reason = COALESCE($2, cancelled_reason), cancelled_at = COALESCE($3, cancelled_at), updated_at = $4
               WHERE id = $5 AND status = $6
               RETURNING *"#
        )
            .bind(change.to.as_str())
            .bind(&change.cancelled_reason)
            .bind(change.cancelled_at)
            .bind(change.at)
            .bind(booking_id)
            .bind(change.from.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        let Some(updated) = updated else {
            return Ok(None);
        };
        record(&mut tx, transition).await?;
        enqueue(&mut tx, notification).await?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(Some(updated))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE management_token = $1").bind(token).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE status IN ('pending', 'confirmed', 'completed') AND blocked_start < $1 AND blocked_end > $2 ORDER BY start_time ASC"
        )
            .bind(end)
            .bind(start)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM bookings WHERE TRUE");
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(session_type_id) = &filter.session_type_id {
            qb.push(" AND session_type_id = ").push_bind(session_type_id.clone());
        }
        if let Some(from) = filter.from {
            qb.push(" AND start_time >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND start_time < ").push_bind(to);
        }
        qb.push(" ORDER BY start_time ASC");

        qb.build_query_as::<Booking>().fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_transitions(&self, booking_id: &str) -> Result<Vec<BookingTransition>, AppError> {
        sqlx::query_as::<_, BookingTransition>(
            "SELECT * FROM booking_transitions WHERE booking_id = $1 ORDER BY occurred_at ASC, seq ASC"
        )
            .bind(booking_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
