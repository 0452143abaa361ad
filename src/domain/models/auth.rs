use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "admin";
pub const TOKEN_AUDIENCE: &str = "scheduler-console";

/// Access token claims as minted by the console's auth service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,

    #[serde(rename = "https://scheduler/claims/role")]
    pub role: String,

    #[serde(rename = "https://scheduler/claims/csrf")]
    pub csrf_token: String,
}
