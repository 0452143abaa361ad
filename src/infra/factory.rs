use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::domain::ports::{
    AvailabilityRepository, BookingRepository, Clock, NotificationRepository, NotificationSink,
    SessionTypeRepository,
};
use crate::domain::services::coordinator::{BookingCoordinator, CoordinatorSettings};
use crate::error::AppError;
use crate::infra::clock::SystemClock;
use crate::infra::notify::{http_notification_sink::HttpNotificationSink, log_notification_sink::LogNotificationSink};
use crate::infra::repositories::{
    postgres_availability_repo::PostgresAvailabilityRepo, postgres_booking_repo::PostgresBookingRepo,
    postgres_notification_repo::PostgresNotificationRepo, postgres_session_type_repo::PostgresSessionTypeRepo,
    sqlite_availability_repo::SqliteAvailabilityRepo, sqlite_booking_repo::SqliteBookingRepo,
    sqlite_notification_repo::SqliteNotificationRepo, sqlite_session_type_repo::SqliteSessionTypeRepo,
};
use crate::state::AppState;

/// Repositories for one backing database.
pub struct Repositories {
    pub session_types: Arc<dyn SessionTypeRepository>,
    pub availability: Arc<dyn AvailabilityRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    pub fn sqlite(pool: SqlitePool) -> Self {
        Self {
            session_types: Arc::new(SqliteSessionTypeRepo::new(pool.clone())),
            availability: Arc::new(SqliteAvailabilityRepo::new(pool.clone())),
            bookings: Arc::new(SqliteBookingRepo::new(pool.clone())),
            notifications: Arc::new(SqliteNotificationRepo::new(pool)),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            session_types: Arc::new(PostgresSessionTypeRepo::new(pool.clone())),
            availability: Arc::new(PostgresAvailabilityRepo::new(pool.clone())),
            bookings: Arc::new(PostgresBookingRepo::new(pool.clone())),
            notifications: Arc::new(PostgresNotificationRepo::new(pool)),
        }
    }
}

/// Wires repositories, the coordinator and the ambient services into an `AppState`.
pub fn assemble_state(
    config: &Config,
    repos: Repositories,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
) -> AppState {
    let coordinator = Arc::new(BookingCoordinator::new(
        repos.session_types.clone(),
        repos.availability.clone(),
        repos.bookings.clone(),
        CoordinatorSettings {
            timezone: config.provider_timezone,
            slot_step_minutes: config.slot_step_minutes,
            public_base_url: config.public_base_url.clone(),
        },
    ));

    AppState {
        config: config.clone(),
        session_type_repo: repos.session_types,
        availability_repo: repos.availability,
        booking_repo: repos.bookings,
        notification_repo: repos.notifications,
        notification_sink: sink,
        coordinator,
        clock,
    }
}

pub fn notification_sink(config: &Config) -> Result<Arc<dyn NotificationSink>, AppError> {
    match &config.notify_webhook_url {
        Some(url) => {
            info!("Notifications will be posted to {}", url);
            Ok(Arc::new(HttpNotificationSink::new(url.clone(), config.notify_webhook_token.clone())?))
        }
        None => {
            info!("NOTIFY_WEBHOOK_URL not set; notifications go to the log");
            Ok(Arc::new(LogNotificationSink))
        }
    }
}

pub async fn connect_sqlite(database_url: &str) -> Result<SqlitePool, AppError> {
    info!("Initializing SQLite connection with WAL Mode...");

    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true)
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await?;

    sqlx::migrate!("./migrations/sqlite").run(&pool).await?;
    Ok(pool)
}

pub async fn connect_postgres(database_url: &str) -> Result<PgPool, AppError> {
    info!("Initializing PostgreSQL connection...");

    let opts = PgConnectOptions::from_str(database_url)?
        .log_statements(LevelFilter::Debug)
        .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect_with(opts)
        .await?;

    sqlx::migrate!("./migrations/postgres").run(&pool).await?;
    Ok(pool)
}

pub async fn bootstrap_state(config: &Config) -> Result<AppState, AppError> {
    let database_url = &config.database_url;

    let repos = if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Repositories::postgres(connect_postgres(database_url).await?)
    } else {
        Repositories::sqlite(connect_sqlite(database_url).await?)
    };

    Ok(assemble_state(config, repos, notification_sink(config)?, Arc::new(SystemClock)))
}
