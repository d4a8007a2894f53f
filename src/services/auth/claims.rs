use serde::{Deserialize, Serialize};

use crate::services::auth::directory::Role;

/// Issuer written into every token this service signs.
pub const ISSUER: &str = "auth-service";

/// Claims of a short-lived access token. Closed struct; no open-ended
/// payload maps. `sub` is the string-encoded numeric identity id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub role: Role,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of a long-lived refresh token. `jti` is the string-encoded id of
/// the server-side store record; the record's existence is the real
/// validity check, not the expiration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: String,
    pub role: Role,
    pub jti: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}
