use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitStream;
use futures_util::StreamExt;
use tracing::{debug, warn};
use ws_protocol::{reserved_types, AckPayload, Envelope};

use crate::connection::Connection;
use crate::dispatch::MessageHandler;
use crate::error::DisconnectReason;
use crate::manager::Manager;

/// Reads frames off the socket until the peer disconnects, a read error
/// occurs, the scope is cancelled (eviction or shutdown), or the read
/// deadline (refreshed on every pong) elapses. This is the only task that
/// reads from the socket, and its teardown is the only place that cancels
/// the connection scope. Returns the reason it stopped, passed on to
/// `on_disconnect`.
pub(crate) async fn run_read_pump<U, H>(mut stream: SplitStream<WebSocket>, conn: Arc<Connection<U>>, manager: Manager<U, H>) -> DisconnectReason
where
    U: Send + Sync + 'static,
    H: MessageHandler<U> + Send + Sync + 'static,
{
    let pong_wait = manager.config().pong_wait;
    let mut deadline = Instant::now() + pong_wait;

    let reason = loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let next = tokio::select! {
            () = conn.scope().cancelled() => break DisconnectReason::ScopeCancelled,
            item = stream.next() => item,
            () = tokio::time::sleep(remaining) => {
                debug!(user_id = conn.user_id, "read deadline elapsed without a pong");
                break DisconnectReason::PongTimeout;
            }
        };

        let message = match next {
            None => break DisconnectReason::PeerClosed,
            Some(Err(err)) => {
                warn!(user_id = conn.user_id, %err, "websocket read error");
                break DisconnectReason::ReadError(err.to_string());
            }
            Some(Ok(message)) => message,
        };

        match message {
            Message::Pong(_) => deadline = Instant::now() + pong_wait,
            Message::Ping(_) => {}
            Message::Close(_) => break DisconnectReason::PeerClosed,
            Message::Binary(_) => {
                let _ = conn.send_error_notification("", "binary frames are not supported").await;
            }
            Message::Text(text) => handle_text(&conn, &manager, &text).await,
        }
    };

    conn.close();
    reason
}

async fn handle_text<U, H>(conn: &Arc<Connection<U>>, manager: &Manager<U, H>, text: &str)
where
    U: Send + Sync + 'static,
    H: MessageHandler<U> + Send + Sync + 'static,
{
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(err) => {
            debug!(user_id = conn.user_id, %err, "dropping malformed envelope");
            return;
        }
    };

    if envelope.kind == reserved_types::CLIENT_ACK {
        let acknowledged_pid = envelope
            .payload
            .as_ref()
            .and_then(|payload| serde_json::from_value::<AckPayload>(payload.clone()).ok())
            .map(|ack| ack.acknowledged_pid);
        match acknowledged_pid {
            Some(pid) if manager.deliver_ack(&pid, envelope) => {}
            Some(pid) => debug!(user_id = conn.user_id, pid, "client_ack for unknown or expired pid"),
            None => debug!(user_id = conn.user_id, "client_ack missing acknowledgedPid"),
        }
        return;
    }

    if let Some(pid) = envelope.pid.clone() {
        if manager.has_pending_response(&pid) {
            manager.deliver_response(&pid, envelope);
            return;
        }
    }

    let original_pid = envelope.pid.clone().unwrap_or_default();
    if let Err(handler_err) = manager.handler().dispatch(Arc::clone(conn), manager, envelope).await {
        let notification = Envelope::error_notification(original_pid, handler_err.code, handler_err.message.clone());
        if let Err(send_err) = conn.send_message(notification).await {
            warn!(user_id = conn.user_id, %send_err, "failed to deliver error notification");
        }
    }
}
