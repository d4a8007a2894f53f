use axum::Json;
use axum::extract::{Path, State};

use crate::api::v1::dto::auth::UserResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Directory lookup by id, available to staff roles only (see the route
/// allow-list).
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, AppError> {
    let identity = state
        .directory
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(UserResponse::from(identity)))
}
