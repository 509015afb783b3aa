//! Shared test utilities for exercising a [`ws_core::Manager`] end to end:
//! a tokio-tungstenite-backed mock client plus a harness that boots a real
//! axum server around an arbitrary manager/handler pair.

pub mod mock_ws_client;
pub mod server;

pub use mock_ws_client::MockWsClient;
pub use server::spawn_test_server;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use ws_core::{Connection, HandlerError, Manager, MessageHandler};
    use ws_protocol::{error_codes, reserved_types, Envelope};

    use super::*;

    /// Echoes any `"ping"` envelope back as `"pong"`; used only to drive
    /// the harness in these tests, not a stand-in for a real dispatcher.
    struct EchoHandler;

    #[async_trait]
    impl MessageHandler<String> for EchoHandler {
        async fn dispatch(&self, conn: Arc<Connection<String>>, _manager: &Manager<String, Self>, envelope: Envelope) -> Result<(), HandlerError> {
            match envelope.kind.as_str() {
                "ping" => {
                    let reply = Envelope::new("pong").with_payload(envelope.payload.clone().unwrap_or(json!({})));
                    conn.send_message(reply).await.map_err(|err| HandlerError::new(error_codes::INTERNAL_ERROR, err.to_string()))?;
                    Ok(())
                }
                "echo_ack" => conn
                    .send_server_ack(envelope.pid.clone().unwrap_or_default(), "ok", None)
                    .await
                    .map_err(|err| HandlerError::new(error_codes::INTERNAL_ERROR, err.to_string())),
                _ => Err(HandlerError::new(error_codes::UNKNOWN_ACTION, format!("unhandled kind {}", envelope.kind))),
            }
        }
    }

    async fn harness() -> (Manager<String, EchoHandler>, String) {
        let manager = Manager::new(ws_core::ManagerConfig::default(), EchoHandler);
        let addr = spawn_test_server(manager.clone(), |user_id| format!("user-{user_id}")).await;
        (manager, format!("ws://{addr}/ws"))
    }

    #[tokio::test]
    async fn client_connects_and_registers() {
        let (manager, url) = harness().await;
        let url = format!("{url}?user_id=1");
        let _client = MockWsClient::connect(&url).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(manager.is_user_online(1));
    }

    #[tokio::test]
    async fn ping_gets_echoed_back_as_pong() {
        let (_manager, url) = harness().await;
        let url = format!("{url}?user_id=2");
        let mut client = MockWsClient::connect(&url).await.unwrap();

        let envelope = Envelope::new("ping").with_payload(json!({"n": 1}));
        client.send_envelope(&envelope).await.unwrap();

        let reply = client.recv_envelope().await.unwrap();
        assert_eq!(reply.kind, "pong");
        assert_eq!(reply.payload, Some(json!({"n": 1})));
    }

    #[tokio::test]
    async fn unrecognized_kind_comes_back_as_error_notification() {
        let (_manager, url) = harness().await;
        let url = format!("{url}?user_id=3");
        let mut client = MockWsClient::connect(&url).await.unwrap();

        let envelope = Envelope::new("nonsense");
        client.send_envelope(&envelope).await.unwrap();

        let reply = client.recv_envelope().await.unwrap();
        assert_eq!(reply.kind, reserved_types::ERROR_NOTIFICATION);
        assert_eq!(reply.error.unwrap().code, error_codes::UNKNOWN_ACTION);
    }

    #[tokio::test]
    async fn reconnect_evicts_the_previous_connection() {
        let (manager, url) = harness().await;
        let url = format!("{url}?user_id=4");

        let mut first = MockWsClient::connect(&url).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(manager.is_user_online(4));

        let _second = MockWsClient::connect(&url).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(manager.is_user_online(4));
        assert!(first.recv_envelope().await.is_err(), "evicted connection should have been closed");
    }

    #[tokio::test]
    async fn client_ack_round_trip_completes_server_side_wait() {
        let (manager, url) = harness().await;
        let url = format!("{url}?user_id=5");
        let mut client = MockWsClient::connect(&url).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let conn = manager.get_connection(5).unwrap();
        let outbound = Envelope::new("server_initiated");
        let pid = outbound.pid.clone().unwrap();

        let wait = tokio::spawn({
            let manager = manager.clone();
            async move { manager.send_for_client_ack(&conn, outbound).await }
        });

        let delivered = client.recv_envelope().await.unwrap();
        assert_eq!(delivered.pid.as_deref(), Some(pid.as_str()));

        let ack = Envelope::new(reserved_types::CLIENT_ACK).with_payload(json!({
            "acknowledgedPid": pid,
            "status": "ok",
        }));
        client.send_envelope(&ack).await.unwrap();

        let result = wait.await.unwrap();
        assert!(result.is_ok());
    }
}
