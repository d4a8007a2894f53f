use sqlx::{FromRow, PgPool};
use std::str::FromStr;

use crate::repos::error::RepoError;
use crate::services::auth::directory::{Identity, NewIdentity, Role};

/// SQLx access to the users table.
///
/// Assumed schema:
/// - users.id (bigserial primary key)
/// - users."firstName", users."lastName" (text)
/// - users.email (text, unique index on lower(email))
/// - users.password (text, PHC-encoded hash)
/// - users.role (text)
/// - users."tenantId" (bigint, nullable)
#[derive(Clone, Debug)]
pub struct UserRepo {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    #[sqlx(rename = "firstName")]
    first_name: String,
    #[sqlx(rename = "lastName")]
    last_name: String,
    email: String,
    password: String,
    role: String,
    #[sqlx(rename = "tenantId")]
    tenant_id: Option<i64>,
}

impl UserRow {
    fn into_identity(self) -> Result<Identity, RepoError> {
        let role = Role::from_str(&self.role)
            .map_err(|_| RepoError::Db(sqlx::Error::Decode("unknown role".into())))?;
        Ok(Identity {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            role,
            password_hash: self.password,
            tenant_id: self.tenant_id,
        })
    }
}

impl UserRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, "firstName", "lastName", email, password, role, "tenantId"
            FROM users
            WHERE email = $1
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_identity).transpose()
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Identity>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, "firstName", "lastName", email, password, role, "tenantId"
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_identity).transpose()
    }

    pub async fn insert(&self, attrs: NewIdentity) -> Result<Identity, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users ("firstName", "lastName", email, password, role, "tenantId")
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, "firstName", "lastName", email, password, role, "tenantId"
            "#,
        )
        .bind(&attrs.first_name)
        .bind(&attrs.last_name)
        .bind(&attrs.email)
        .bind(&attrs.password_hash)
        .bind(attrs.role.as_str())
        .bind(attrs.tenant_id)
        .fetch_one(&self.pool)
        .await?;

        row.into_identity()
    }
}
