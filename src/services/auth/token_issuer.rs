use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use tracing::{error, warn};
use uuid::Uuid;

use crate::config::ConfigError;
use crate::error::AppError;
use crate::services::auth::claims::{AccessTokenClaims, ISSUER, RefreshTokenClaims};
use crate::services::auth::directory::Role;

/// Signs access tokens (RS256, asymmetric) and refresh tokens (HS256,
/// symmetric).
///
/// Access tokens are verified by parties that must never hold the signing
/// secret, so they get the asymmetric key; refresh tokens come back only to
/// this service, so a shared secret suffices.
///
/// Key material is parsed at construction. A missing or malformed private
/// key is a configuration fault that must keep the service from starting.
#[derive(Clone)]
pub struct TokenIssuer {
    access_key: EncodingKey,
    access_kid: Option<String>,
    refresh_key: EncodingKey,
    access_ttl_seconds: u64,
    refresh_ttl_seconds: u64,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("TokenIssuer")
            .field("access_kid", &self.access_kid)
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .finish()
    }
}

impl TokenIssuer {
    pub fn new(
        access_private_key_pem: &str,
        access_kid: Option<String>,
        refresh_secret: &str,
        access_ttl_seconds: u64,
        refresh_ttl_seconds: u64,
    ) -> Result<Self, ConfigError> {
        let access_key = EncodingKey::from_rsa_pem(access_private_key_pem.as_bytes())
            .map_err(|e| {
                warn!(error = %e, "failed to parse access-token private key PEM (expected RSA)");
                ConfigError::Invalid("ACCESS_PRIVATE_KEY_PEM")
            })?;

        Ok(Self {
            access_key,
            access_kid,
            refresh_key: EncodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl_seconds,
            refresh_ttl_seconds,
        })
    }

    pub fn access_ttl_seconds(&self) -> u64 {
        self.access_ttl_seconds
    }

    pub fn refresh_ttl_seconds(&self) -> u64 {
        self.refresh_ttl_seconds
    }

    /// Sign a short-lived access token for `sub`.
    pub fn issue_access_token(&self, sub: i64, role: Role) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            sub: sub.to_string(),
            role,
            iss: ISSUER.to_string(),
            iat: now,
            exp: now + self.access_ttl_seconds as i64,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.access_kid.clone();
        jsonwebtoken::encode(&header, &claims, &self.access_key).map_err(|e| {
            error!(error = %e, "failed to sign access token");
            AppError::Internal
        })
    }

    /// Sign a long-lived refresh token bound to an existing store record.
    /// The record must be persisted first; its id becomes `jti`.
    pub fn issue_refresh_token(
        &self,
        sub: i64,
        role: Role,
        token_id: Uuid,
    ) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = RefreshTokenClaims {
            sub: sub.to_string(),
            role,
            jti: token_id.to_string(),
            iss: ISSUER.to_string(),
            iat: now,
            exp: now + self.refresh_ttl_seconds as i64,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.refresh_key).map_err(
            |e| {
                error!(error = %e, "failed to sign refresh token");
                AppError::Internal
            },
        )
    }
}
