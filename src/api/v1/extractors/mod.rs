use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::auth::directory::Role;

/// Authenticated identity of the current request, inserted into request
/// extensions by the auth middleware.
///
/// `refresh_token_id` is set only on the refresh path, where rotation needs
/// to know which record to delete.
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub user_id: i64,
    pub role: Role,
    pub refresh_token_id: Option<Uuid>,
}

impl<S> FromRequestParts<S> for AuthCtx
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Absence means the route is not behind the auth middleware; fail
        // closed rather than serve unauthenticated.
        parts
            .extensions
            .get::<AuthCtx>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
