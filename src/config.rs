use std::env;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::AppError;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// IANA zone the provider's availability is expressed in.
    pub provider_timezone: Tz,
    /// Step between candidate slot starts. `None` steps by the session footprint.
    pub slot_step_minutes: Option<i64>,
    pub jwt_public_key: String, // Ed25519 public key (PEM)
    pub auth_issuer: String,
    /// Base of the management links handed to requesters.
    pub public_base_url: String,
    pub notify_webhook_url: Option<String>,
    pub notify_webhook_token: Option<String>,
    pub notify_poll_interval: Duration,
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String, AppError> {
    optional(key).ok_or_else(|| AppError::Config(format!("{} must be set", key)))
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match optional(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value '{}'", key, raw))),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let timezone = optional("PROVIDER_TIMEZONE").unwrap_or_else(|| "UTC".to_string());
        let provider_timezone: Tz = timezone
            .parse()
            .map_err(|_| AppError::Config(format!("PROVIDER_TIMEZONE '{}' is not an IANA zone", timezone)))?;

        let slot_step_minutes = match optional("SLOT_STEP_MINUTES") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(step) if step > 0 => Some(step),
                _ => return Err(AppError::Config(format!("SLOT_STEP_MINUTES must be a positive integer, got '{}'", raw))),
            },
            None => None,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            port: parsed("PORT", 3000)?,
            provider_timezone,
            slot_step_minutes,
            jwt_public_key: required("JWT_PUBLIC_KEY")?,
            auth_issuer: optional("AUTH_ISSUER").unwrap_or_else(|| "https://auth.scheduler.local".to_string()),
            public_base_url: optional("PUBLIC_BASE_URL").unwrap_or_else(|| "http://localhost:3000".to_string()),
            notify_webhook_url: optional("NOTIFY_WEBHOOK_URL"),
            notify_webhook_token: optional("NOTIFY_WEBHOOK_TOKEN"),
            notify_poll_interval: Duration::from_secs(parsed("NOTIFY_POLL_SECS", 5)?),
        })
    }
}
