use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use ws_protocol::Envelope;

use crate::config::ManagerConfig;

/// Drains the outbound queue onto the socket, sends periodic pings, and
/// is the only task that writes to the socket. Exits on scope
/// cancellation, queue closure, or any write error.
pub(crate) async fn run_write_pump(mut sink: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Envelope>, scope: CancellationToken, config: ManagerConfig) {
    let mut ticker = tokio::time::interval(config.ping_period);
    ticker.tick().await;

    loop {
        tokio::select! {
            () = scope.cancelled() => {
                let frame = CloseFrame {
                    code: axum::extract::ws::close_code::AWAY,
                    reason: "server closing".into(),
                };
                let _ = tokio::time::timeout(config.write_wait, sink.send(Message::Close(Some(frame)))).await;
                break;
            }
            envelope = rx.recv() => {
                match envelope {
                    None => {
                        let _ = tokio::time::timeout(config.write_wait, sink.send(Message::Close(None))).await;
                        break;
                    }
                    Some(envelope) => {
                        let text = match serde_json::to_string(&envelope) {
                            Ok(text) => text,
                            Err(err) => {
                                warn!(%err, "failed to serialize outbound envelope");
                                continue;
                            }
                        };
                        if !matches!(tokio::time::timeout(config.write_wait, sink.send(Message::Text(text))).await, Ok(Ok(()))) {
                            break;
                        }
                    }
                }
            }
            _ = ticker.tick() => {
                if !matches!(tokio::time::timeout(config.write_wait, sink.send(Message::Ping(Vec::new().into()))).await, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
}
