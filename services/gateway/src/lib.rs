pub mod auth;
pub mod config;
pub mod handler;
pub mod http;
pub mod state;
pub mod ws_route;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_route::ws_upgrade_handler))
        .route("/healthz", get(http::health::healthz))
        .route("/readyz", get(http::health::readyz))
        .route("/api/v1/demo-tokens", post(http::demo_tokens::create_demo_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
