//! The illustrative application layer on top of the connection manager:
//! a chat broadcast, a notification send that waits for a client ack,
//! and a synchronous presence query, all routed through the dispatch
//! façade.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;
use ws_core::{error_codes, reserved_types, AckPayload, Connection, DataRequestPayload, DataRequestRouter, DisconnectReason, Envelope, HandlerError, Manager, MessageHandler};

use crate::auth::UserData;

pub struct GatewayHandler {
    data_requests: DataRequestRouter<UserData, GatewayHandler>,
}

impl GatewayHandler {
    pub fn new() -> Self {
        let router = DataRequestRouter::new();
        router.register("presence", "query", Arc::new(|conn, manager, data| Box::pin(presence_query(conn, manager, data))));
        router.register("notifications", "send", Arc::new(|conn, manager, data| Box::pin(handle_notify(conn, manager, data))));
        Self {
            data_requests: router,
        }
    }
}

impl Default for GatewayHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct ChatPayload {
    body: String,
}

#[derive(Debug, Deserialize)]
struct NotifyPayload {
    #[serde(rename = "targetUserId")]
    target_user_id: i64,
    body: String,
}

#[derive(Debug, Deserialize)]
struct PresenceQuery {
    #[serde(rename = "userIds")]
    user_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
struct PresenceSnapshot {
    online: Vec<i64>,
    offline: Vec<i64>,
}

#[async_trait]
impl MessageHandler<UserData> for GatewayHandler {
    async fn dispatch(&self, conn: Arc<Connection<UserData>>, manager: &Manager<UserData, Self>, envelope: Envelope) -> Result<(), HandlerError> {
        match envelope.kind.as_str() {
            "chat" => handle_chat(conn, manager, envelope).await,
            reserved_types::DATA_REQUEST => handle_data_request(&self.data_requests, conn, manager.clone(), envelope).await,
            other => Err(HandlerError::new(
                error_codes::PROTOCOL_ERROR,
                format!("unrecognized message type '{other}'"),
            )),
        }
    }

    async fn on_disconnect(&self, user_id: i64, user_data: &UserData, reason: &DisconnectReason) {
        tracing::info!(user_id, display_name = %user_data.display_name, %reason, "connection closed");
    }
}

async fn handle_chat(conn: Arc<Connection<UserData>>, manager: &Manager<UserData, GatewayHandler>, envelope: Envelope) -> Result<(), HandlerError> {
    let payload: ChatPayload = envelope
        .payload
        .clone()
        .and_then(|value| serde_json::from_value(value).ok())
        .ok_or_else(|| HandlerError::new(error_codes::PROTOCOL_ERROR, "chat payload must contain a body"))?;

    if let Some(pid) = envelope.pid.clone() {
        if let Err(err) = conn.send_server_ack(pid, "ok", None).await {
            warn!(%err, "failed to ack inbound chat message");
        }
    }

    let outbound = Envelope::new("chat")
        .with_from(conn.user_id)
        .with_payload(serde_json::json!({ "body": payload.body }));

    if let Some(target_user_id) = envelope.target_user_id {
        let _ = manager.send_message_to_user(target_user_id, outbound).await;
    } else {
        let _ = manager.broadcast_to_all(outbound, &[conn.user_id]).await;
    }
    Ok(())
}

async fn handle_data_request(router: &DataRequestRouter<UserData, GatewayHandler>, conn: Arc<Connection<UserData>>, manager: Manager<UserData, GatewayHandler>, envelope: Envelope) -> Result<(), HandlerError> {
    let request: DataRequestPayload = envelope
        .payload
        .clone()
        .and_then(|value| serde_json::from_value(value).ok())
        .ok_or_else(|| HandlerError::new(error_codes::PROTOCOL_ERROR, "data_request payload malformed"))?;

    let original_pid = envelope.pid.clone().unwrap_or_default();
    match router.dispatch(conn.clone(), manager, &request.resource, &request.action, request.data).await {
        Some(Ok(result)) => {
            let response = Envelope {
                pid: Some(original_pid),
                kind: "data_response".to_string(),
                from_user_id: Some(conn.user_id),
                target_user_id: None,
                payload: Some(result),
                error: None,
            };
            conn.send_message(response)
                .await
                .map_err(|err| HandlerError::new(error_codes::HANDLER_ERROR, err.to_string()))
        }
        Some(Err(handler_err)) => Err(handler_err),
        None => Err(HandlerError::new(
            error_codes::UNKNOWN_ACTION,
            format!("no handler for {}/{}", request.resource, request.action),
        )),
    }
}

async fn handle_notify(_conn: Arc<Connection<UserData>>, manager: Manager<UserData, GatewayHandler>, data: Option<serde_json::Value>) -> Result<serde_json::Value, HandlerError> {
    let payload: NotifyPayload = data
        .and_then(|value| serde_json::from_value(value).ok())
        .ok_or_else(|| HandlerError::new(error_codes::PROTOCOL_ERROR, "notify payload must contain targetUserId and body"))?;

    let target = manager
        .get_connection(payload.target_user_id)
        .ok_or_else(|| HandlerError::new(error_codes::HANDLER_ERROR, "target user is not connected"))?;

    let notification = Envelope::new("notification").with_payload(serde_json::json!({ "body": payload.body }));
    let ack = manager
        .send_for_client_ack(&target, notification)
        .await
        .map_err(|err| HandlerError::new(error_codes::HANDLER_ERROR, err.to_string()))?;

    let status = ack
        .payload
        .and_then(|value| serde_json::from_value::<AckPayload>(value).ok())
        .map(|ack| ack.status)
        .ok_or_else(|| HandlerError::new(error_codes::HANDLER_ERROR, "client ack missing a status"))?;

    Ok(serde_json::json!({ "status": status }))
}

async fn presence_query(_conn: Arc<Connection<UserData>>, manager: Manager<UserData, GatewayHandler>, data: Option<serde_json::Value>) -> Result<serde_json::Value, HandlerError> {
    let query: PresenceQuery = data
        .and_then(|value| serde_json::from_value(value).ok())
        .ok_or_else(|| HandlerError::new(error_codes::PROTOCOL_ERROR, "presence query must contain userIds"))?;

    let mut online = Vec::new();
    let mut offline = Vec::new();
    for user_id in query.user_ids {
        if manager.is_user_online(user_id) {
            online.push(user_id);
        } else {
            offline.push(user_id);
        }
    }
    Ok(serde_json::to_value(PresenceSnapshot { online, offline }).expect("PresenceSnapshot always serializes"))
}
