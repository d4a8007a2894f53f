use axum::Json;
use axum::extract::State;

use crate::state::AppState;

/// The published verification key set. Other services verify our access
/// tokens against this document; the private signing key and the refresh
/// secret never leave process configuration.
pub async fn jwks(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json((*state.jwks).clone())
}
