//! Integration tests for the websocket upgrade endpoint: auth gating,
//! chat broadcast, and eviction on reconnect, all driven through a real
//! bound listener.

use std::time::Duration;

use gateway::handler::GatewayHandler;
use gateway::state::AppState;
use ws_core::{Manager, ManagerConfig};
use ws_protocol::Envelope;
use ws_test_support::MockWsClient;

async fn spawn_gateway() -> (AppState, String) {
    let manager = Manager::new(ManagerConfig::default(), GatewayHandler::new());
    let state = AppState::new(manager);
    let router = gateway::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (state, format!("ws://{addr}/ws"))
}

#[tokio::test]
async fn upgrade_without_bearer_token_is_rejected() {
    let (_state, url) = spawn_gateway().await;
    let result = MockWsClient::connect(&url).await;
    assert!(result.is_err(), "anonymous upgrade should fail the handshake");
}

#[tokio::test]
async fn valid_token_upgrades_and_registers_the_connection() {
    let (state, url) = spawn_gateway().await;
    let (user_id, token) = state.tokens.issue("alice".to_string());

    let _client = MockWsClient::connect_with_token(&url, &token).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(state.manager.is_user_online(user_id));
}

#[tokio::test]
async fn chat_message_is_broadcast_to_the_other_connection() {
    let (state, url) = spawn_gateway().await;
    let (_alice_id, alice_token) = state.tokens.issue("alice".to_string());
    let (_bob_id, bob_token) = state.tokens.issue("bob".to_string());

    let mut alice = MockWsClient::connect_with_token(&url, &alice_token).await.unwrap();
    let mut bob = MockWsClient::connect_with_token(&url, &bob_token).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let chat = Envelope::new("chat").with_payload(serde_json::json!({"body": "hello"}));
    alice.send_envelope(&chat).await.unwrap();

    let ack = alice.recv_envelope().await.unwrap();
    assert_eq!(ack.kind, ws_protocol::reserved_types::SERVER_ACK);

    let received = bob.recv_envelope().await.unwrap();
    assert_eq!(received.kind, "chat");
    assert_eq!(received.payload.unwrap()["body"], "hello");
}

#[tokio::test]
async fn reconnecting_as_the_same_user_evicts_the_first_session() {
    let (state, url) = spawn_gateway().await;
    let (user_id, token) = state.tokens.issue("carol".to_string());

    let mut first = MockWsClient::connect_with_token(&url, &token).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(state.manager.is_user_online(user_id));

    let _second = MockWsClient::connect_with_token(&url, &token).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(state.manager.is_user_online(user_id));
    assert!(first.recv_envelope().await.is_err());
}

#[tokio::test]
async fn presence_query_reports_online_and_offline_users() {
    let (state, url) = spawn_gateway().await;
    let (online_id, online_token) = state.tokens.issue("dina".to_string());
    let offline_id = online_id + 1000;

    let mut client = MockWsClient::connect_with_token(&url, &online_token).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let query = Envelope::new(ws_protocol::reserved_types::DATA_REQUEST).with_payload(serde_json::json!({
        "resource": "presence",
        "action": "query",
        "data": {"userIds": [online_id, offline_id]},
    }));
    client.send_envelope(&query).await.unwrap();

    let response = client.recv_envelope().await.unwrap();
    assert_eq!(response.kind, "data_response");
    let payload = response.payload.unwrap();
    assert_eq!(payload["online"], serde_json::json!([online_id]));
    assert_eq!(payload["offline"], serde_json::json!([offline_id]));
}

#[tokio::test]
async fn broadcast_to_users_reports_not_connected_for_offline_recipients() {
    let (state, url) = spawn_gateway().await;
    let (user_one, token_one) = state.tokens.issue("frank".to_string());
    let (user_three, token_three) = state.tokens.issue("gail".to_string());
    let offline_user = user_one + 5000;

    let mut one = MockWsClient::connect_with_token(&url, &token_one).await.unwrap();
    let mut three = MockWsClient::connect_with_token(&url, &token_three).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let envelope = Envelope::new("event");
    let failures = state
        .manager
        .broadcast_to_users(&[user_one, offline_user, user_three], envelope, &[])
        .await;

    assert_eq!(failures.len(), 1);
    assert!(matches!(failures.get(&offline_user), Some(ws_core::ManagerError::NotConnected)));
    assert_eq!(one.recv_envelope().await.unwrap().kind, "event");
    assert_eq!(three.recv_envelope().await.unwrap().kind, "event");
}
