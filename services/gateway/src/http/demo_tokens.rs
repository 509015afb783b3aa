use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::http::response::bad_request;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DemoTokenRequest {
    #[serde(rename = "displayName")]
    display_name: String,
}

#[derive(Debug, Serialize)]
pub struct DemoTokenResponse {
    #[serde(rename = "userId")]
    user_id: i64,
    token: String,
}

/// Mints an opaque in-memory bearer token for the given display name.
/// Exists purely to make the upgrade endpoint exercisable without a real
/// identity provider; never persisted and does not survive a restart.
pub async fn create_demo_token(State(state): State<AppState>, Json(request): Json<DemoTokenRequest>) -> Response {
    if request.display_name.trim().is_empty() {
        return bad_request("displayName must not be empty");
    }
    let (user_id, token) = state.tokens.issue(request.display_name);
    Json(DemoTokenResponse { user_id, token }).into_response()
}
