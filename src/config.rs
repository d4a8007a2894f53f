use std::net::SocketAddr;
use std::str::FromStr;
use std::{env, fmt};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Configuration faults are fatal: the process must refuse to serve traffic
/// rather than run with missing or garbage key material.
#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub database_url: String,
    // RSA private key used to sign access tokens (RS256).
    pub access_private_key_pem: String,
    // `kid` placed in access-token headers; must match the published JWKS.
    pub access_key_id: Option<String>,
    // The published verification key set, as a JWKS JSON document.
    pub jwks_json: String,
    // When set, the verifier fetches keys from this URL instead of the
    // local document (other services verifying our access tokens do this).
    pub jwks_url: Option<String>,
    // HMAC secret for refresh tokens (HS256). Verified only by this service.
    pub refresh_token_secret: String,
    // Token lifetimes (seconds). Defaults: 1 hour access, 1 year refresh.
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_seconds: u64,
    pub cookie_domain: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("AUTH_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5501);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("AUTH_PORT"))?;

        let app_env = AppEnv::from_env();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let access_private_key_pem = env::var("ACCESS_PRIVATE_KEY_PEM")
            .map_err(|_| ConfigError::Missing("ACCESS_PRIVATE_KEY_PEM"))?
            .replace("\\n", "\n");

        let access_key_id = env::var("ACCESS_KEY_ID").ok();

        let jwks_json = env::var("JWKS_JSON").map_err(|_| ConfigError::Missing("JWKS_JSON"))?;
        let jwks_url = env::var("JWKS_URL").ok();

        let refresh_token_secret = env::var("REFRESH_TOKEN_SECRET")
            .map_err(|_| ConfigError::Missing("REFRESH_TOKEN_SECRET"))?;
        if refresh_token_secret.len() < 32 {
            return Err(ConfigError::Invalid("REFRESH_TOKEN_SECRET"));
        }

        let access_token_ttl_seconds = env::var("ACCESS_TOKEN_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3_600); // 1 hour
        let refresh_token_ttl_seconds = env::var("REFRESH_TOKEN_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(31_536_000); // 1 year

        let cookie_domain = env::var("COOKIE_DOMAIN").ok();

        Ok(Config {
            addr,
            app_env,
            database_url,
            access_private_key_pem,
            access_key_id,
            jwks_json,
            jwks_url,
            refresh_token_secret,
            access_token_ttl_seconds,
            refresh_token_ttl_seconds,
            cookie_domain,
        })
    }
}

impl From<ConfigError> for AppError {
    fn from(_: ConfigError) -> Self {
        AppError::Internal
    }
}
