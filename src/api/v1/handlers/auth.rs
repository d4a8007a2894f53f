use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::api::v1::dto::auth::{
    AuthenticatedResponse, LoginRequest, RegisterRequest, UserResponse,
};
use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::middleware::auth::access::ACCESS_TOKEN_COOKIE;
use crate::middleware::auth::refresh::REFRESH_TOKEN_COOKIE;
use crate::services::auth::account::Registration;
use crate::services::auth::token_service::TokenPair;
use crate::state::{AppState, CookiePolicy};

fn auth_cookie(
    name: &'static str,
    value: String,
    max_age_seconds: u64,
    policy: &CookiePolicy,
) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::seconds(max_age_seconds as i64));
    cookie.set_secure(policy.secure);
    if let Some(domain) = &policy.domain {
        cookie.set_domain(domain.clone());
    }
    cookie
}

// An expired empty cookie with the same scoping overwrites the stored one.
// Added outright: `CookieJar::remove` only emits a removal for cookies the
// jar originally contained, and a response-only jar contains none.
fn removal_cookie(name: &'static str, policy: &CookiePolicy) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, "");
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::ZERO);
    if let Some(domain) = &policy.domain {
        cookie.set_domain(domain.clone());
    }
    cookie
}

/// Both tokens are delivered as scoped http-only cookies; the same policy
/// applies on every flow that sets them.
fn set_token_cookies(state: &AppState, pair: &TokenPair) -> CookieJar {
    CookieJar::new()
        .add(auth_cookie(
            ACCESS_TOKEN_COOKIE,
            pair.access_token.clone(),
            state.tokens.access_ttl_seconds(),
            &state.cookies,
        ))
        .add(auth_cookie(
            REFRESH_TOKEN_COOKIE,
            pair.refresh_token.clone(),
            state.tokens.refresh_ttl_seconds(),
            &state.cookies,
        ))
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthenticatedResponse>), AppError> {
    req.validate()
        .map_err(|msg| AppError::InvalidRequest(msg.to_string()))?;

    let identity = state
        .accounts
        .register(Registration {
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            email: req.email,
            password: req.password,
        })
        .await?;

    let pair = state.tokens.issue_pair(identity.id, identity.role).await?;
    let jar = set_token_cookies(&state, &pair);

    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthenticatedResponse { id: identity.id }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthenticatedResponse>), AppError> {
    req.validate()
        .map_err(|msg| AppError::InvalidRequest(msg.to_string()))?;

    let identity = state.accounts.login(&req.email, &req.password).await?;

    let pair = state.tokens.issue_pair(identity.id, identity.role).await?;
    let jar = set_token_cookies(&state, &pair);

    Ok((jar, Json(AuthenticatedResponse { id: identity.id })))
}

/// Identity introspection for the bearer of a valid access token.
pub async fn self_info(
    State(state): State<AppState>,
    ctx: AuthCtx,
) -> Result<Json<UserResponse>, AppError> {
    let identity = state
        .directory
        .find_by_id(ctx.user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(UserResponse::from(identity)))
}

/// Rotation: mint a new pair, invalidate the record behind the presented
/// refresh token. The refresh middleware already confirmed the token is
/// signed, unexpired and not revoked.
pub async fn refresh(
    State(state): State<AppState>,
    ctx: AuthCtx,
) -> Result<(CookieJar, Json<AuthenticatedResponse>), AppError> {
    let old_token_id = ctx.refresh_token_id.ok_or(AppError::Unauthorized)?;

    // Re-read the directory so a newly assigned role lands in the claims.
    let identity = state
        .directory
        .find_by_id(ctx.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let pair = state
        .tokens
        .rotate(identity.id, identity.role, old_token_id)
        .await?;
    let jar = set_token_cookies(&state, &pair);

    Ok((jar, Json(AuthenticatedResponse { id: identity.id })))
}

/// Delete the record behind the presented refresh token and drop both
/// cookies. Later refresh attempts with this token fail the revocation
/// check.
pub async fn logout(
    State(state): State<AppState>,
    ctx: AuthCtx,
) -> Result<(CookieJar, StatusCode), AppError> {
    let token_id = ctx.refresh_token_id.ok_or(AppError::Unauthorized)?;

    state.tokens.revoke(token_id).await?;

    let jar = CookieJar::new()
        .add(removal_cookie(ACCESS_TOKEN_COOKIE, &state.cookies))
        .add(removal_cookie(REFRESH_TOKEN_COOKIE, &state.cookies));

    Ok((jar, StatusCode::OK))
}
