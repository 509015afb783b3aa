use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use ws_protocol::{error_codes, Envelope};

use crate::error::ConnectionError;

/// A single registered client session.
///
/// Owns the outbound send queue (the *only* writer to the socket) and a
/// cancellation scope that is the canonical "this connection is going
/// away" signal: the write pump closes the socket on scope cancellation,
/// and the read pump's teardown cancels the scope on any read error.
pub struct Connection<U> {
    pub user_id: i64,
    user_data: U,
    tx: mpsc::Sender<Envelope>,
    scope: CancellationToken,
    send_timeout: Duration,
}

impl<U> Connection<U> {
    pub(crate) fn new(
        user_id: i64,
        user_data: U,
        tx: mpsc::Sender<Envelope>,
        scope: CancellationToken,
        write_wait: Duration,
    ) -> Self {
        Self {
            user_id,
            user_data,
            tx,
            scope,
            send_timeout: write_wait / 2,
        }
    }

    pub fn user_data(&self) -> &U {
        &self.user_data
    }

    pub fn scope(&self) -> &CancellationToken {
        &self.scope
    }

    pub fn is_closed(&self) -> bool {
        self.scope.is_cancelled()
    }

    /// Enqueues `envelope` for delivery. Never writes to the socket
    /// directly -- the write pump is the sole writer.
    pub async fn send_message(&self, envelope: Envelope) -> Result<(), ConnectionError> {
        if self.scope.is_cancelled() {
            return Err(ConnectionError::Closed);
        }
        tokio::select! {
            result = self.tx.send(envelope) => {
                result.map_err(|_| ConnectionError::Closed)
            }
            () = tokio::time::sleep(self.send_timeout) => Err(ConnectionError::Timeout),
            () = self.scope.cancelled() => Err(ConnectionError::Closed),
        }
    }

    pub async fn send_error_notification(&self, original_pid: impl Into<String>, message: impl Into<String>) -> Result<(), ConnectionError> {
        self.send_message(Envelope::error_notification(original_pid, error_codes::HANDLER_ERROR, message))
            .await
    }

    pub async fn send_server_ack(&self, acknowledged_pid: impl Into<String>, status: impl Into<String>, error: Option<String>) -> Result<(), ConnectionError> {
        self.send_message(Envelope::server_ack(acknowledged_pid, status, error))
            .await
    }

    /// Cancels the connection scope. Idempotent; safe to call more than
    /// once or concurrently with teardown.
    pub fn close(&self) {
        if !self.scope.is_cancelled() {
            self.scope.cancel();
        } else {
            warn!(user_id = self.user_id, "close called on already-closed connection");
        }
    }
}
