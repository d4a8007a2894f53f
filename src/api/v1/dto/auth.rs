use serde::{Deserialize, Serialize};

use crate::services::auth::directory::{Identity, Role};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err("email is required");
        }
        if self.first_name.trim().len() < 2 {
            return Err("first name is required");
        }
        if self.last_name.trim().len() < 2 {
            return Err("last name is required");
        }
        if self.password.trim().len() < 6 {
            return Err("password must be at least 6 characters");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.email.trim().is_empty() {
            return Err("email is required");
        }
        if self.password.is_empty() {
            return Err("password is required");
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct AuthenticatedResponse {
    pub id: i64,
}

/// Identity as exposed to clients. Never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<i64>,
}

impl From<Identity> for UserResponse {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            first_name: identity.first_name,
            last_name: identity.last_name,
            email: identity.email,
            role: identity.role,
            tenant_id: identity.tenant_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_rejects_short_password() {
        let req = RegisterRequest {
            first_name: "Test".into(),
            last_name: "User".into(),
            email: "test@example.com".into(),
            password: "12345".into(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn register_request_accepts_well_formed_input() {
        let req = RegisterRequest {
            first_name: "Test".into(),
            last_name: "User".into(),
            email: "Test@Example.Com ".into(),
            password: "password".into(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn user_response_omits_password_hash() {
        let identity = Identity {
            id: 1,
            first_name: "Test".into(),
            last_name: "User".into(),
            email: "test@example.com".into(),
            role: Role::Customer,
            password_hash: "secret".into(),
            tenant_id: None,
        };
        let json = serde_json::to_string(&UserResponse::from(identity)).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"role\":\"customer\""));
    }
}
