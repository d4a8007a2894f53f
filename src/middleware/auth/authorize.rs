use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::warn;

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::directory::Role;

/// Role gate for a protected operation. The allow-list is declared
/// statically at the route site, flat, with no hierarchy between roles.
///
/// Runs strictly after the identity middleware; a request without an
/// `AuthCtx` never passed authentication and is rejected, not forwarded.
pub async fn require_role(
    allowed: &'static [Role],
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = req
        .extensions()
        .get::<AuthCtx>()
        .ok_or(AppError::Unauthorized)?;

    if !allowed.contains(&ctx.role) {
        warn!(user_id = ctx.user_id, role = %ctx.role, "insufficient role for operation");
        return Err(AppError::Forbidden);
    }

    Ok(next.run(req).await)
}
