mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use tower::ServiceExt;

use auth_service::app;
use auth_service::services::auth::credentials::CredentialService;
use auth_service::services::auth::directory::{NewIdentity, Role, UserDirectory};

use common::test_state;

async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

fn cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .map(|v| {
            v[prefix.len()..]
                .split(';')
                .next()
                .unwrap_or_default()
                .to_string()
        })
}

fn set_cookie_attrs(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .map(str::to_string)
}

async fn post_json(router: &Router, uri: &str, body: Value) -> Response<Body> {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn register_default(router: &Router) -> Response<Body> {
    post_json(
        router,
        "/api/v1/auth/register",
        json!({
            "firstName": "Test",
            "lastName": "User",
            "email": "Test@Example.Com ",
            "password": "password"
        }),
    )
    .await
}

fn token_payload(token: &str) -> Value {
    let segment = token.split('.').nth(1).unwrap();
    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
}

#[tokio::test]
async fn register_normalizes_email_and_binds_sub_to_the_new_id() {
    let harness = test_state();
    let router = app::router(harness.state);

    let response = register_default(&router).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let access = cookie_value(&response, "accessToken").expect("accessToken cookie");
    let refresh = cookie_value(&response, "refreshToken").expect("refreshToken cookie");
    assert!(!refresh.is_empty());

    let body = body_json(response).await;
    let id = body["id"].as_i64().expect("numeric id");

    let stored = harness
        .directory
        .find_by_email("test@example.com")
        .await
        .unwrap()
        .expect("stored under normalized email");
    assert_eq!(stored.id, id);
    assert_eq!(stored.role, Role::Customer);

    assert_eq!(token_payload(&access)["sub"], id.to_string());
}

#[tokio::test]
async fn auth_cookies_are_http_only_and_strict() {
    let harness = test_state();
    let router = app::router(harness.state);

    let response = register_default(&router).await;

    for name in ["accessToken", "refreshToken"] {
        let attrs = set_cookie_attrs(&response, name).unwrap();
        assert!(attrs.contains("HttpOnly"), "{}", attrs);
        assert!(attrs.contains("SameSite=Strict"), "{}", attrs);
        assert!(attrs.contains("Path=/"), "{}", attrs);
    }
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let harness = test_state();
    let router = app::router(harness.state);

    register_default(&router).await;
    let response = register_default(&router).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_returns_the_registered_id() {
    let harness = test_state();
    let router = app::router(harness.state);

    let body = body_json(register_default(&router).await).await;
    let id = body["id"].as_i64().unwrap();

    let response = post_json(
        &router,
        "/api/v1/auth/login",
        json!({"email": "test@example.com", "password": "password"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"].as_i64(), Some(id));
}

#[tokio::test]
async fn wrong_password_and_unknown_email_fail_identically() {
    let harness = test_state();
    let router = app::router(harness.state);
    register_default(&router).await;

    let wrong_password = post_json(
        &router,
        "/api/v1/auth/login",
        json!({"email": "test@example.com", "password": "nope42"}),
    )
    .await;
    let unknown_email = post_json(
        &router,
        "/api/v1/auth/login",
        json!({"email": "nobody@example.com", "password": "password"}),
    )
    .await;

    assert_eq!(wrong_password.status(), StatusCode::BAD_REQUEST);
    assert_eq!(unknown_email.status(), wrong_password.status());

    let a = body_json(wrong_password).await;
    let b = body_json(unknown_email).await;
    assert_eq!(a["error"]["message"], "email or password is incorrect");
    assert_eq!(a, b);
}

#[tokio::test]
async fn self_returns_identity_for_a_bearer_token() {
    let harness = test_state();
    let router = app::router(harness.state);

    let response = register_default(&router).await;
    let access = cookie_value(&response, "accessToken").unwrap();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/self")
                .header(header::AUTHORIZATION, format!("Bearer {}", access))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["email"], "test@example.com");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn self_accepts_the_cookie_when_the_header_is_the_string_undefined() {
    let harness = test_state();
    let router = app::router(harness.state);

    let response = register_default(&router).await;
    let access = cookie_value(&response, "accessToken").unwrap();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/self")
                .header(header::AUTHORIZATION, "Bearer undefined")
                .header(header::COOKIE, format!("accessToken={}", access))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let harness = test_state();
    let router = app::router(harness.state);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/auth/self")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn customer_role_is_denied_on_staff_routes() {
    let harness = test_state();
    let router = app::router(harness.state);

    let response = register_default(&router).await;
    let access = cookie_value(&response, "accessToken").unwrap();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/users/1")
                .header(header::AUTHORIZATION, format!("Bearer {}", access))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_role_passes_the_gate() {
    let harness = test_state();

    let creds = CredentialService::new();
    harness
        .directory
        .create(NewIdentity {
            first_name: "Site".into(),
            last_name: "Admin".into(),
            email: "admin@example.com".into(),
            password_hash: creds.hash("hunter22").unwrap(),
            role: Role::Admin,
            tenant_id: None,
        })
        .await
        .unwrap();

    let router = app::router(harness.state);

    let response = post_json(
        &router,
        "/api/v1/auth/login",
        json!({"email": "admin@example.com", "password": "hunter22"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let access = cookie_value(&response, "accessToken").unwrap();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/users/1")
                .header(header::AUTHORIZATION, format!("Bearer {}", access))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

async fn post_with_refresh_cookie(router: &Router, uri: &str, refresh: &str) -> Response<Body> {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::COOKIE, format!("refreshToken={}", refresh))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn refresh_rotates_and_revokes_the_presented_token() {
    let harness = test_state();
    let router = app::router(harness.state);

    let response = register_default(&router).await;
    let first_refresh = cookie_value(&response, "refreshToken").unwrap();

    let response = post_with_refresh_cookie(&router, "/api/v1/auth/refresh", &first_refresh).await;
    assert_eq!(response.status(), StatusCode::OK);
    let second_refresh = cookie_value(&response, "refreshToken").unwrap();
    assert_ne!(second_refresh, first_refresh);

    // A second refresh with the stale token is revoked; the fresh one works.
    let stale = post_with_refresh_cookie(&router, "/api/v1/auth/refresh", &first_refresh).await;
    assert_eq!(stale.status(), StatusCode::UNAUTHORIZED);

    let fresh = post_with_refresh_cookie(&router, "/api/v1/auth/refresh", &second_refresh).await;
    assert_eq!(fresh.status(), StatusCode::OK);
}

#[tokio::test]
async fn refresh_ignores_the_authorization_header() {
    let harness = test_state();
    let router = app::router(harness.state);

    let response = register_default(&router).await;
    let refresh = cookie_value(&response, "refreshToken").unwrap();

    // Refresh tokens are cookie-only; a bearer header must not stand in.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/refresh")
                .header(header::AUTHORIZATION, format!("Bearer {}", refresh))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn an_access_token_is_not_accepted_as_a_refresh_token() {
    let harness = test_state();
    let router = app::router(harness.state);

    let response = register_default(&router).await;
    let access = cookie_value(&response, "accessToken").unwrap();

    let response = post_with_refresh_cookie(&router, "/api/v1/auth/refresh", &access).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_refresh_token_and_clears_cookies() {
    let harness = test_state();
    let router = app::router(harness.state);

    let response = register_default(&router).await;
    let refresh = cookie_value(&response, "refreshToken").unwrap();

    let response = post_with_refresh_cookie(&router, "/api/v1/auth/logout", &refresh).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Both cookies come back emptied and expired so the client drops them.
    for name in ["accessToken", "refreshToken"] {
        assert_eq!(cookie_value(&response, name).as_deref(), Some(""));
        let attrs = set_cookie_attrs(&response, name).unwrap();
        assert!(attrs.contains("Max-Age=0"), "{}", attrs);
    }

    let response = post_with_refresh_cookie(&router, "/api/v1/auth/refresh", &refresh).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_is_idempotent() {
    let harness = test_state();
    let router = app::router(harness.state);

    let response = register_default(&router).await;
    let refresh = cookie_value(&response, "refreshToken").unwrap();

    post_with_refresh_cookie(&router, "/api/v1/auth/logout", &refresh).await;
    let again = post_with_refresh_cookie(&router, "/api/v1/auth/logout", &refresh).await;
    assert_eq!(again.status(), StatusCode::OK);
}

#[tokio::test]
async fn jwks_document_is_published() {
    let harness = test_state();
    let router = app::router(harness.state);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/.well-known/jwks.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["keys"][0]["kty"], "RSA");
    assert_eq!(body["keys"][0]["alg"], "RS256");
}

#[tokio::test]
async fn malformed_registration_is_a_validation_error() {
    let harness = test_state();
    let router = app::router(harness.state);

    let response = post_json(
        &router,
        "/api/v1/auth/register",
        json!({
            "firstName": "T",
            "lastName": "User",
            "email": "not-an-email",
            "password": "pw"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
