use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use tracing::info;

use crate::auth::extract_bearer;
use crate::http::response::{json_error, unauthorized};
use crate::state::AppState;

pub async fn ws_upgrade_handler(State(state): State<AppState>, headers: HeaderMap, ws: WebSocketUpgrade) -> Response {
    let origin = headers.get(axum::http::header::ORIGIN).and_then(|value| value.to_str().ok());
    if !state.manager.config().origin_allowed(origin) {
        return json_error(StatusCode::FORBIDDEN, "origin_not_allowed", "origin not allowed");
    }

    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer);

    let Some(token) = token else {
        return unauthorized("missing bearer token");
    };

    let (user_id, user_data) = match state.tokens.validate(token) {
        Ok(pair) => pair,
        Err(err) => return unauthorized(err.to_string()),
    };

    info!(user_id, "upgrading websocket connection");
    ws.on_upgrade(move |socket| async move {
        state.manager.handle_socket(socket, user_id, user_data).await;
    })
}
