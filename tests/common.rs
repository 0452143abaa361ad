#![allow(dead_code)]

use appointment_scheduler::{
    api::router::create_router,
    config::Config,
    domain::models::{auth::{Claims, ADMIN_ROLE, TOKEN_AUDIENCE}, notification::Notification},
    domain::ports::{Clock, NotificationSink},
    error::AppError,
    infra::{clock::ManualClock, factory::{assemble_state, connect_sqlite, Repositories}},
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use sqlx::{Pool, Sqlite};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_ISSUER: &str = "test-issuer";

/// Records every delivered notification; can be told to fail.
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<Notification>>,
    pub fail: Mutex<bool>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), AppError> {
        if *self.fail.lock().unwrap() {
            return Err(AppError::InternalWithMsg("webhook unreachable".into()));
        }
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct AuthHeaders {
    pub access_token: String,
    pub csrf_token: String,
}

pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<RecordingSink>,
}

/// Monday 2024-01-01 08:00 UTC.
pub fn default_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_timezone("UTC").await
    }

    pub async fn with_timezone(tz: &str) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let pool = connect_sqlite(&db_url).await.expect("Failed to set up test db");

        let config = Config {
            database_url: db_url,
            port: 0,
            provider_timezone: tz.parse().expect("bad test timezone"),
            slot_step_minutes: None,
            jwt_public_key: include_str!("../tests/keys/test_public.pem").to_string(),
            auth_issuer: TEST_ISSUER.to_string(),
            public_base_url: "https://book.example.com".to_string(),
            notify_webhook_url: None,
            notify_webhook_token: None,
            notify_poll_interval: Duration::from_secs(3600),
        };

        let clock = Arc::new(ManualClock::new(default_now()));
        let sink = Arc::new(RecordingSink::default());

        let state = Arc::new(assemble_state(
            &config,
            Repositories::sqlite(pool.clone()),
            sink.clone() as Arc<dyn NotificationSink>,
            clock.clone() as Arc<dyn Clock>,
        ));

        let router = create_router(state.clone());

        Self { router, pool, db_filename, state, clock, sink }
    }

    pub fn token_for(&self, subject: &str, role: &str) -> AuthHeaders {
        let now = Utc::now().timestamp() as usize;
        let csrf_token = Uuid::new_v4().to_string();
        let claims = Claims {
            iss: TEST_ISSUER.to_string(),
            sub: subject.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            exp: now + 900,
            iat: now,
            jti: Uuid::new_v4().to_string(),
            role: role.to_string(),
            csrf_token: csrf_token.clone(),
        };

        let key = EncodingKey::from_ed_pem(include_bytes!("../tests/keys/test_private.pem")).unwrap();
        let access_token = encode(&Header::new(Algorithm::EdDSA), &claims, &key).unwrap();

        AuthHeaders { access_token, csrf_token }
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn admin(&self) -> AuthHeaders {
        self.token_for("admin-1", ADMIN_ROLE)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        auth: Option<&AuthHeaders>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder
                .header(header::COOKIE, format!("access_token={}", auth.access_token))
                .header("X-CSRF-Token", &auth.csrf_token);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// 60 minute sessions with a 15 minute trailing buffer, Mondays 09:00-12:00.
    pub async fn seed_consultation(&self) -> Value {
        let admin = self.admin();
        let (status, session_type) = self.request(
            Method::POST,
            "/api/v1/admin/session-types",
            Some(json!({
                "name": "Consultation",
                "slug": "consultation",
                "duration_min": 60,
                "buffer_after_min": 15,
                "max_advance_days": 60
            })),
            Some(&admin),
        ).await;
        assert_eq!(status, StatusCode::CREATED, "{}", session_type);

        let (status, _) = self.request(
            Method::PUT,
            "/api/v1/admin/availability/weekly",
            Some(json!({ "rules": [{ "day_of_week": 1, "start_time": "09:00", "end_time": "12:00" }] })),
            Some(&admin),
        ).await;
        assert_eq!(status, StatusCode::OK);

        session_type
    }

    pub async fn book(&self, slug: &str, date: &str, time: &str, name: &str) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            &format!("/api/v1/session-types/{}/book", slug),
            Some(json!({
                "date": date,
                "time": time,
                "requester_name": name,
                "requester_email": format!("{}@example.com", name.to_lowercase()),
            })),
            None,
        ).await
    }

    pub async fn slots(&self, slug: &str, date: &str) -> Vec<String> {
        let (status, body) = self.request(
            Method::GET,
            &format!("/api/v1/session-types/{}/slots?date={}", slug, date),
            None,
            None,
        ).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["slots"].as_array().unwrap().iter().map(|s| s.as_str().unwrap().to_string()).collect()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}
