use axum::{
    extract::{FromRequestParts, FromRef},
    http::{request::Parts, Method},
};
use crate::state::AppState;
use crate::domain::models::auth::{Claims, ADMIN_ROLE, TOKEN_AUDIENCE};
use crate::error::AppError;
use std::sync::Arc;
use tower_cookies::Cookies;
use jsonwebtoken::{decode, DecodingKey, Validation, Algorithm};
use tracing::Span;

/// An administrator authenticated by the console's access token.
/// Holds the opaque principal id from the token subject.
pub struct AdminPrincipal(pub String);

impl<S> FromRequestParts<S> for AdminPrincipal
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = parts.extensions.get::<Cookies>()
            .ok_or(AppError::InternalWithMsg("cookie layer missing".into()))?;

        let access_token = cookies.get("access_token")
            .ok_or(AppError::Unauthorized)?
            .value()
            .to_string();

        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);

        let decoding_key = DecodingKey::from_ed_pem(app_state.config.jwt_public_key.as_bytes())
            .map_err(|e| AppError::Config(format!("JWT_PUBLIC_KEY is not a valid Ed25519 PEM: {}", e)))?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.set_issuer(&[app_state.config.auth_issuer.as_str()]);

        let token_data = decode::<Claims>(&access_token, &decoding_key, &validation)
            .map_err(|_| AppError::Unauthorized)?;

        let method = &parts.method;
        if method != Method::GET && method != Method::HEAD && method != Method::OPTIONS {
            let csrf_header_val = parts.headers.get("X-CSRF-Token")
                .ok_or(AppError::Forbidden("Missing CSRF token".into()))?
                .to_str()
                .map_err(|_| AppError::Forbidden("Malformed CSRF token".into()))?;

            if csrf_header_val != token_data.claims.csrf_token {
                return Err(AppError::Forbidden("CSRF token mismatch".into()));
            }
        }

        if token_data.claims.role != ADMIN_ROLE {
            return Err(AppError::Forbidden("Administrator role required".into()));
        }

        Span::current().record("admin_id", token_data.claims.sub.as_str());

        Ok(AdminPrincipal(token_data.claims.sub))
    }
}
