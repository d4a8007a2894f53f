use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::repos::error::RepoError;
use crate::repos::refresh_token_repo::RefreshTokenRepo;
use crate::services::auth::directory::Role;
use crate::services::auth::token_issuer::TokenIssuer;

/// A persisted refresh-token record. Its existence is the sole source of
/// truth for refresh-token validity; the signed token merely carries a copy
/// of the id.
///
/// Lifecycle: a record is created at login/register/refresh time and deleted
/// exactly once, either during rotation (the old id goes when a new pair is
/// issued) or on logout. The resulting states are issued, rotated,
/// revoked-by-logout and expired, but only "row exists" vs "row absent" is
/// persisted; rotated and revoked-by-logout are indistinguishable from the
/// outside, both simply delete the row.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The persistent token store the lifecycle consumes. Backed by Postgres in
/// production; tests substitute an in-memory store.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Insert a record owned by `user_id` expiring after `ttl`. Must be
    /// called before signing, since the generated id becomes `jti`.
    async fn persist(&self, user_id: i64, ttl: ChronoDuration)
    -> Result<RefreshTokenRecord, AppError>;

    /// Look up a record by id and owner. A wrong owner is absent.
    async fn find_owned(
        &self,
        token_id: Uuid,
        user_id: i64,
    ) -> Result<Option<RefreshTokenRecord>, AppError>;

    /// Delete by id, returning affected rows. Idempotent.
    async fn delete(&self, token_id: Uuid) -> Result<u64, AppError>;
}

#[async_trait]
impl RefreshTokenStore for RefreshTokenRepo {
    async fn persist(
        &self,
        user_id: i64,
        ttl: ChronoDuration,
    ) -> Result<RefreshTokenRecord, AppError> {
        let expires_at = Utc::now() + ttl;
        let row = self.insert(user_id, expires_at).await.map_err(|e| {
            error!(user_id, error = %e, "failed to persist refresh token record");
            AppError::Dependency
        })?;
        Ok(RefreshTokenRecord {
            id: row.id,
            user_id: row.user_id,
            expires_at: row.expires_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn find_owned(
        &self,
        token_id: Uuid,
        user_id: i64,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let row = RefreshTokenRepo::find_owned(self, token_id, user_id)
            .await
            .map_err(|e: RepoError| {
                error!(token_id = %token_id, error = %e, "failed to look up refresh token record");
                AppError::Dependency
            })?;
        Ok(row.map(|r| RefreshTokenRecord {
            id: r.id,
            user_id: r.user_id,
            expires_at: r.expires_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }))
    }

    async fn delete(&self, token_id: Uuid) -> Result<u64, AppError> {
        RefreshTokenRepo::delete(self, token_id)
            .await
            .map_err(|e| {
                error!(token_id = %token_id, error = %e, "failed to delete refresh token record");
                AppError::Dependency
            })
    }
}

/// An access/refresh pair handed to the client as opaque bearer artifacts.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_token_id: Uuid,
}

/// Orchestrates issuance, rotation and revocation against the store.
#[derive(Clone)]
pub struct TokenService {
    issuer: TokenIssuer,
    store: std::sync::Arc<dyn RefreshTokenStore>,
}

impl TokenService {
    pub fn new(issuer: TokenIssuer, store: std::sync::Arc<dyn RefreshTokenStore>) -> Self {
        Self { issuer, store }
    }

    pub fn access_ttl_seconds(&self) -> u64 {
        self.issuer.access_ttl_seconds()
    }

    pub fn refresh_ttl_seconds(&self) -> u64 {
        self.issuer.refresh_ttl_seconds()
    }

    /// Issue a fresh access/refresh pair. The refresh record is persisted
    /// before signing so the token can embed the generated id.
    pub async fn issue_pair(&self, user_id: i64, role: Role) -> Result<TokenPair, AppError> {
        let access_token = self.issuer.issue_access_token(user_id, role)?;

        let ttl = ChronoDuration::seconds(self.issuer.refresh_ttl_seconds() as i64);
        let record = self.store.persist(user_id, ttl).await?;
        let refresh_token = self.issuer.issue_refresh_token(user_id, role, record.id)?;

        debug!(user_id, token_id = %record.id, "issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
            refresh_token_id: record.id,
        })
    }

    /// Rotate: issue a new pair, then delete the record backing the
    /// presented token.
    ///
    /// Persist-new-then-delete-old keeps at least one valid refresh token
    /// alive through a mid-rotation failure, at the cost of a brief window
    /// with two valid tokens. If the old record is already gone the token
    /// was rotated concurrently or revoked; the caller is rejected and the
    /// just-persisted record is removed again on a best-effort basis.
    pub async fn rotate(
        &self,
        user_id: i64,
        role: Role,
        old_token_id: Uuid,
    ) -> Result<TokenPair, AppError> {
        let pair = self.issue_pair(user_id, role).await?;

        let affected = match self.store.delete(old_token_id).await {
            Ok(n) => n,
            Err(e) => {
                // The old record is still valid; the new one stays too and
                // the client retries. Covered by each token's own row.
                warn!(token_id = %old_token_id, "failed to delete rotated refresh token record");
                return Err(e);
            }
        };

        if affected == 0 {
            warn!(user_id, token_id = %old_token_id, "refresh token already rotated or revoked");
            if let Err(e) = self.store.delete(pair.refresh_token_id).await {
                warn!(token_id = %pair.refresh_token_id, error = %e, "cleanup of unused refresh token record failed");
            }
            return Err(AppError::Unauthorized);
        }

        Ok(pair)
    }

    /// Revoke a refresh token by deleting its record. Idempotent; revoking
    /// an already-deleted id affects nothing.
    pub async fn revoke(&self, token_id: Uuid) -> Result<u64, AppError> {
        let affected = self.store.delete(token_id).await?;
        debug!(token_id = %token_id, affected, "revoked refresh token");
        Ok(affected)
    }
}
