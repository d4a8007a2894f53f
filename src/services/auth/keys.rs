use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, warn};

use crate::config::ConfigError;
use crate::error::AppError;
use crate::services::auth::claims::{AccessTokenClaims, ISSUER, RefreshTokenClaims};

const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    pub n: String,
    pub e: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

enum KeySource {
    // Key set loaded once from process configuration.
    Static,
    // Key set fetched from a discovery endpoint, re-fetched on kid miss.
    Remote { url: String, http: reqwest::Client },
}

/// Read-mostly cache of RSA verification keys, keyed by `kid`.
///
/// The cache is shared across requests and only ever replaced wholesale
/// after a fetch; a single request never invalidates it.
pub struct JwksCache {
    source: KeySource,
    keys: RwLock<Vec<(Option<String>, DecodingKey)>>,
}

fn decode_keys(set: &JwkSet) -> Result<Vec<(Option<String>, DecodingKey)>, ConfigError> {
    let mut keys = Vec::with_capacity(set.keys.len());
    for jwk in &set.keys {
        if jwk.kty != "RSA" {
            continue;
        }
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|_| ConfigError::Invalid("JWKS_JSON"))?;
        keys.push((jwk.kid.clone(), key));
    }
    if keys.is_empty() {
        return Err(ConfigError::Invalid("JWKS_JSON"));
    }
    Ok(keys)
}

impl JwksCache {
    /// Build from a JWKS document held in configuration. Malformed key
    /// material is a startup fault.
    pub fn from_document(jwks_json: &str) -> Result<Self, ConfigError> {
        let set: JwkSet =
            serde_json::from_str(jwks_json).map_err(|_| ConfigError::Invalid("JWKS_JSON"))?;
        let keys = decode_keys(&set)?;
        Ok(Self {
            source: KeySource::Static,
            keys: RwLock::new(keys),
        })
    }

    /// Build against a remote key-set endpoint. Keys are fetched lazily and
    /// re-fetched when a token references an unknown `kid`.
    pub fn remote(url: String) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .map_err(|_| ConfigError::Invalid("JWKS_URL"))?;
        Ok(Self {
            source: KeySource::Remote { url, http },
            keys: RwLock::new(Vec::new()),
        })
    }

    async fn lookup(&self, kid: Option<&str>) -> Option<DecodingKey> {
        let keys = self.keys.read().await;
        match kid {
            // No kid in the token header: only unambiguous with one key.
            None => {
                if keys.len() == 1 {
                    Some(keys[0].1.clone())
                } else {
                    None
                }
            }
            Some(kid) => keys
                .iter()
                .find(|(k, _)| k.as_deref() == Some(kid))
                .map(|(_, key)| key.clone()),
        }
    }

    async fn refresh(&self) -> Result<(), AppError> {
        let KeySource::Remote { url, http } = &self.source else {
            return Ok(());
        };
        let set: JwkSet = http
            .get(url.as_str())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                error!(error = %e, "failed to fetch key set");
                AppError::Dependency
            })?
            .json()
            .await
            .map_err(|e| {
                error!(error = %e, "failed to parse key set");
                AppError::Dependency
            })?;

        let keys = decode_keys(&set).map_err(|e| {
            error!(error = %e, "key set contained no usable RSA keys");
            AppError::Dependency
        })?;

        *self.keys.write().await = keys;
        Ok(())
    }

    /// Resolve the verification key for a token header. Unknown `kid` after
    /// a re-fetch is an authentication failure; an unreachable key-set
    /// endpoint is a transient dependency failure.
    pub async fn key_for(&self, kid: Option<&str>) -> Result<DecodingKey, AppError> {
        if let Some(key) = self.lookup(kid).await {
            return Ok(key);
        }
        self.refresh().await?;
        self.lookup(kid).await.ok_or(AppError::Unauthorized)
    }
}

/// RS256 access-token verification against the published key set.
///
/// The algorithm is pinned: a token whose header names any other algorithm
/// is rejected before signature checking.
pub struct AccessTokenVerifier {
    keys: JwksCache,
    validation: Validation,
}

impl AccessTokenVerifier {
    pub fn new(keys: JwksCache) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[ISSUER]);
        Self { keys, validation }
    }

    pub async fn verify(&self, token: &str) -> Result<AccessTokenClaims, AppError> {
        let header = jsonwebtoken::decode_header(token).map_err(|_| AppError::Unauthorized)?;
        let key = self.keys.key_for(header.kid.as_deref()).await?;

        let data = jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &self.validation)
            .map_err(|e| {
                warn!(error = %e, "access token verification failed");
                AppError::Unauthorized
            })?;

        Ok(data.claims)
    }
}

/// HS256 refresh-token verification with the symmetric secret. Only this
/// service verifies refresh tokens, so no key set is involved.
pub struct RefreshTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl RefreshTokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<RefreshTokenClaims, AppError> {
        let data = jsonwebtoken::decode::<RefreshTokenClaims>(
            token,
            &self.decoding_key,
            &self.validation,
        )
        .map_err(|e| {
            warn!(error = %e, "refresh token verification failed");
            AppError::Unauthorized
        })?;

        Ok(data.claims)
    }
}
