use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repos::error::RepoError;

/// SQLx access to the refresh_tokens table.
///
/// Assumed schema:
/// - refresh_tokens.id (uuid primary key, server-generated)
/// - refresh_tokens."userId" (bigint, references users.id)
/// - refresh_tokens."expiresAt" (timestamptz)
/// - refresh_tokens."createdAt", refresh_tokens."updatedAt" (timestamptz)
///
/// Rows are never updated in place. Rotation is delete-old + insert-new,
/// so several outstanding rows per user are legal (one per device).
#[derive(Clone, Debug)]
pub struct RefreshTokenRepo {
    pool: PgPool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTokenRow {
    pub id: Uuid,
    #[sqlx(rename = "userId")]
    pub user_id: i64,
    #[sqlx(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    #[sqlx(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl RefreshTokenRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a row for a newly issued refresh token and return it.
    ///
    /// The generated id becomes the token's `jti` claim, so the caller must
    /// insert before signing.
    pub async fn insert(
        &self,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRow, RepoError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            INSERT INTO refresh_tokens ("userId", "expiresAt")
            VALUES ($1, $2)
            RETURNING id, "userId", "expiresAt", "createdAt", "updatedAt"
            "#,
        )
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Fetch a row by id, but only when it belongs to `user_id`. A row that
    /// exists under a different owner is reported as absent.
    pub async fn find_owned(
        &self,
        id: Uuid,
        user_id: i64,
    ) -> Result<Option<RefreshTokenRow>, RepoError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, "userId", "expiresAt", "createdAt", "updatedAt"
            FROM refresh_tokens
            WHERE id = $1 AND "userId" = $2
            LIMIT 1
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Delete a row by id. Idempotent: a missing id affects zero rows and is
    /// not an error. Zero affected rows during rotation means the token was
    /// already rotated or revoked.
    pub async fn delete(&self, id: Uuid) -> Result<u64, RepoError> {
        let done = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(done.rows_affected())
    }
}
