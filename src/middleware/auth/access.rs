use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::state::AppState;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Candidate access token: the `Authorization: Bearer` header wins unless
/// it is absent, empty, or the literal string "undefined" (browser clients
/// serialize a missing token that way); then the cookie is tried.
fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        && let Some(token) = value.strip_prefix("Bearer ")
        && !token.is_empty()
        && token != "undefined"
    {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
}

/// Verify the inbound access token and populate `AuthCtx`.
///
/// Every verification failure collapses into the same 401; the cause is
/// only visible in server logs.
pub async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_access_token(req.headers()).ok_or(AppError::Unauthorized)?;

    let claims = state.access_verifier.verify(&token).await?;

    let user_id: i64 = claims.sub.parse().map_err(|_| AppError::Unauthorized)?;

    req.extensions_mut().insert(AuthCtx {
        user_id,
        role: claims.role,
        refresh_token_id: None,
    });

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(auth: Option<&str>, cookie: Option<&str>) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(a) = auth {
            h.insert(header::AUTHORIZATION, HeaderValue::from_str(a).unwrap());
        }
        if let Some(c) = cookie {
            h.insert(header::COOKIE, HeaderValue::from_str(c).unwrap());
        }
        h
    }

    #[test]
    fn bearer_header_is_preferred() {
        let h = headers(Some("Bearer abc"), Some("accessToken=xyz"));
        assert_eq!(extract_access_token(&h).as_deref(), Some("abc"));
    }

    #[test]
    fn literal_undefined_falls_back_to_cookie() {
        let h = headers(Some("Bearer undefined"), Some("accessToken=xyz"));
        assert_eq!(extract_access_token(&h).as_deref(), Some("xyz"));
    }

    #[test]
    fn empty_bearer_falls_back_to_cookie() {
        let h = headers(Some("Bearer "), Some("accessToken=xyz"));
        assert_eq!(extract_access_token(&h).as_deref(), Some("xyz"));
    }

    #[test]
    fn no_candidate_yields_none() {
        let h = headers(None, None);
        assert_eq!(extract_access_token(&h), None);
    }
}
