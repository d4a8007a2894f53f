use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::error;

use crate::error::AppError;

/// One-way password hashing with Argon2id at fixed parameters. The PHC
/// output string carries algorithm, parameters and salt, so verification
/// needs no side channel.
#[derive(Clone, Default)]
pub struct CredentialService {
    argon2: Argon2<'static>,
}

impl CredentialService {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "password hashing failed");
                AppError::Internal
            })?;
        Ok(hash.to_string())
    }

    /// Returns false on mismatch and on an unparseable stored hash; the
    /// comparison itself is delegated to the argon2 crate's verifier.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return false;
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let creds = CredentialService::new();
        let hash = creds.hash("password").unwrap();
        assert!(creds.verify("password", &hash));
    }

    #[test]
    fn wrong_password_is_rejected_without_error() {
        let creds = CredentialService::new();
        let hash = creds.hash("password").unwrap();
        assert!(!creds.verify("passwort", &hash));
    }

    #[test]
    fn garbage_stored_hash_is_a_mismatch_not_a_panic() {
        let creds = CredentialService::new();
        assert!(!creds.verify("password", "not-a-phc-string"));
    }

    #[test]
    fn hashes_are_salted() {
        let creds = CredentialService::new();
        let a = creds.hash("password").unwrap();
        let b = creds.hash("password").unwrap();
        assert_ne!(a, b);
    }
}
