use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use crate::api::v1::handlers::{auth, users};
use crate::middleware::auth::access::access_middleware;
use crate::middleware::auth::authorize::require_role;
use crate::middleware::auth::refresh::{parse_refresh_middleware, validate_refresh_middleware};
use crate::services::auth::directory::Role;
use crate::state::AppState;

const STAFF: &[Role] = &[Role::Admin, Role::Manager];

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let authenticated = Router::new()
        .route("/auth/self", get(auth::self_info))
        .layer(from_fn_with_state(state.clone(), access_middleware));

    // Rotation requires the full revocation check; logout only needs a
    // valid signature since deleting a missing record is a no-op.
    let refresh = Router::new()
        .route("/auth/refresh", post(auth::refresh))
        .layer(from_fn_with_state(state.clone(), validate_refresh_middleware));

    let logout = Router::new()
        .route("/auth/logout", post(auth::logout))
        .layer(from_fn_with_state(state.clone(), parse_refresh_middleware));

    let staff = Router::new()
        .route("/users/{id}", get(users::get_user))
        .route_layer(from_fn(|req, next| require_role(STAFF, req, next)))
        .layer(from_fn_with_state(state, access_middleware));

    public
        .merge(authenticated)
        .merge(refresh)
        .merge(logout)
        .merge(staff)
}
