//! Integration tests for the plain-HTTP surface: health checks and the
//! demo token minting endpoint.

use gateway::handler::GatewayHandler;
use gateway::state::AppState;
use reqwest::StatusCode;
use serde_json::json;
use ws_core::{Manager, ManagerConfig};

async fn spawn_gateway() -> String {
    let manager = Manager::new(ManagerConfig::default(), GatewayHandler::new());
    let state = AppState::new(manager);
    let router = gateway::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn healthz_and_readyz_report_ok() {
    let base = spawn_gateway().await;
    let client = reqwest::Client::new();

    let healthz = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert_eq!(healthz.status(), StatusCode::OK);

    let readyz = client.get(format!("{base}/readyz")).send().await.unwrap();
    assert_eq!(readyz.status(), StatusCode::OK);
}

#[tokio::test]
async fn demo_token_endpoint_mints_a_usable_token() {
    let base = spawn_gateway().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/v1/demo-tokens"))
        .json(&json!({"displayName": "erin"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["token"].is_string());
    assert!(body["userId"].is_i64());
}

#[tokio::test]
async fn demo_token_endpoint_rejects_empty_display_name() {
    let base = spawn_gateway().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/v1/demo-tokens"))
        .json(&json!({"displayName": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
