use async_trait::async_trait;
use tracing::error;

use crate::error::AppError;
use crate::repos::user_repo::UserRepo;

/// Closed role enumeration. Allow-lists on protected routes are flat; no
/// hierarchy or inheritance between roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity as the directory knows it. The core reads id/role for claim
/// construction and never mutates the record.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
    pub tenant_id: Option<i64>,
}

/// Attributes for a new identity. `email` must already be normalized
/// (trimmed, lowercased) and `password_hash` already computed.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub tenant_id: Option<i64>,
}

/// The user directory the token subsystem consumes. Backed by Postgres in
/// production; tests substitute an in-memory directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AppError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Identity>, AppError>;
    async fn create(&self, attrs: NewIdentity) -> Result<Identity, AppError>;
}

#[async_trait]
impl UserDirectory for UserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AppError> {
        self.find_by_email(email).await.map_err(|e| {
            error!(error = %e, "failed to look up user by email");
            AppError::Dependency
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Identity>, AppError> {
        self.find_by_id(id).await.map_err(|e| {
            error!(user_id = id, error = %e, "failed to look up user by id");
            AppError::Dependency
        })
    }

    async fn create(&self, attrs: NewIdentity) -> Result<Identity, AppError> {
        use crate::repos::error::RepoError;

        self.insert(attrs).await.map_err(|e| match e {
            RepoError::Conflict => AppError::Conflict,
            RepoError::Db(e) => {
                error!(error = %e, "failed to create user");
                AppError::Dependency
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_through_text() {
        for role in [Role::Customer, Role::Manager, Role::Admin] {
            assert_eq!(Role::from_str(role.as_str()), Ok(role));
        }
        assert!(Role::from_str("superuser").is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"customer\"").unwrap(),
            Role::Customer
        );
    }
}
