use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use tracing::warn;
use uuid::Uuid;

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::claims::RefreshTokenClaims;
use crate::state::AppState;

pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Refresh tokens travel only in their dedicated cookie. The Authorization
/// header is never consulted, so the two token kinds stay
/// non-interchangeable at the transport level.
fn extract_refresh_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
}

fn parse_claims(state: &AppState, headers: &HeaderMap) -> Result<(RefreshTokenClaims, i64, Uuid), AppError> {
    let token = extract_refresh_token(headers).ok_or(AppError::Unauthorized)?;
    let claims = state.refresh_verifier.verify(&token)?;

    let user_id: i64 = claims.sub.parse().map_err(|_| AppError::Unauthorized)?;
    let token_id = Uuid::parse_str(&claims.jti).map_err(|_| AppError::Unauthorized)?;

    Ok((claims, user_id, token_id))
}

/// Full refresh validation: signature, then the revocation check against
/// the store. A cryptographically valid token whose record is gone was
/// rotated or revoked and is rejected. A store failure is a transient
/// dependency failure, not a revocation.
pub async fn validate_refresh_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let (claims, user_id, token_id) = parse_claims(&state, req.headers())?;

    let record = state.refresh_store.find_owned(token_id, user_id).await?;
    if record.is_none() {
        warn!(user_id, token_id = %token_id, "refresh token presented after revocation");
        return Err(AppError::Unauthorized);
    }

    req.extensions_mut().insert(AuthCtx {
        user_id,
        role: claims.role,
        refresh_token_id: Some(token_id),
    });

    Ok(next.run(req).await)
}

/// Signature-only refresh parsing, without the store round-trip. Used by
/// logout, where deleting an already-deleted record is a harmless no-op.
pub async fn parse_refresh_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let (claims, user_id, token_id) = parse_claims(&state, req.headers())?;

    req.extensions_mut().insert(AuthCtx {
        user_id,
        role: claims.role,
        refresh_token_id: Some(token_id),
    });

    Ok(next.run(req).await)
}
