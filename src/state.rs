use std::sync::Arc;

use crate::services::auth::account::AccountService;
use crate::services::auth::directory::UserDirectory;
use crate::services::auth::keys::{AccessTokenVerifier, RefreshTokenVerifier};
use crate::services::auth::token_service::{RefreshTokenStore, TokenService};

/// Cookie attributes applied uniformly to every flow that sets auth
/// cookies (register, login, refresh).
#[derive(Clone, Debug)]
pub struct CookiePolicy {
    pub domain: Option<String>,
    pub secure: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub tokens: Arc<TokenService>,
    pub access_verifier: Arc<AccessTokenVerifier>,
    pub refresh_verifier: Arc<RefreshTokenVerifier>,
    pub refresh_store: Arc<dyn RefreshTokenStore>,
    pub directory: Arc<dyn UserDirectory>,
    pub cookies: CookiePolicy,
    pub jwks: Arc<serde_json::Value>,
}
