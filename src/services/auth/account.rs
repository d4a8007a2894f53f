use std::sync::Arc;
use tracing::debug;

use crate::error::AppError;
use crate::services::auth::credentials::CredentialService;
use crate::services::auth::directory::{Identity, NewIdentity, Role, UserDirectory};

/// Registration and login against the user directory.
#[derive(Clone)]
pub struct AccountService {
    directory: Arc<dyn UserDirectory>,
    credentials: CredentialService,
}

/// Trim and lowercase, the canonical form for directory lookups and
/// storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl AccountService {
    pub fn new(directory: Arc<dyn UserDirectory>, credentials: CredentialService) -> Self {
        Self {
            directory,
            credentials,
        }
    }

    /// Create an identity with the customer role. Duplicate emails are a
    /// conflict; the unique index backs up the pre-check.
    pub async fn register(&self, reg: Registration) -> Result<Identity, AppError> {
        let email = normalize_email(&reg.email);

        if self.directory.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict);
        }

        let password_hash = self.credentials.hash(&reg.password)?;

        let identity = self
            .directory
            .create(NewIdentity {
                first_name: reg.first_name,
                last_name: reg.last_name,
                email,
                password_hash,
                role: Role::Customer,
                tenant_id: None,
            })
            .await?;

        debug!(user_id = identity.id, "registered user");
        Ok(identity)
    }

    /// Verify credentials. Unknown email and wrong password collapse into
    /// the same generic failure so neither field is revealed.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let email = normalize_email(email);

        let identity = self
            .directory
            .find_by_email(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !self.credentials.verify(password, &identity.password_hash) {
            return Err(AppError::InvalidCredentials);
        }

        Ok(identity)
    }
}
