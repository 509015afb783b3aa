use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocket;
use dashmap::DashMap;
use futures_util::StreamExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use ws_protocol::Envelope;

use crate::config::ManagerConfig;
use crate::connection::Connection;
use crate::dispatch::MessageHandler;
use crate::error::{ManagerError, WaitError};
use crate::pending::PendingTable;
use crate::read::run_read_pump;
use crate::write::run_write_pump;

struct ManagerInner<U, H> {
    config: ManagerConfig,
    registry: DashMap<i64, Arc<Connection<U>>>,
    pending_acks: PendingTable,
    pending_responses: PendingTable,
    scope: CancellationToken,
    handler: H,
}

/// The registry of live connections plus correlated send/broadcast
/// operations. Cheap to clone: internally an `Arc`.
pub struct Manager<U, H> {
    inner: Arc<ManagerInner<U, H>>,
}

impl<U, H> Clone for Manager<U, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<U, H> Manager<U, H>
where
    U: Send + Sync + 'static,
    H: MessageHandler<U> + Send + Sync + 'static,
{
    pub fn new(config: ManagerConfig, handler: H) -> Self {
        let manager = Self {
            inner: Arc::new(ManagerInner {
                config,
                registry: DashMap::new(),
                pending_acks: PendingTable::new(),
                pending_responses: PendingTable::new(),
                scope: CancellationToken::new(),
                handler,
            }),
        };
        manager.spawn_sweeper();
        manager
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    fn spawn_sweeper(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            crate::sweeper::run(manager).await;
        });
    }

    pub(crate) fn scope(&self) -> &CancellationToken {
        &self.inner.scope
    }

    /// Reclaims pending-ack and pending-response entries older than their
    /// respective timeouts. Called by the sweeper on every tick.
    pub(crate) fn sweep_pending_tables(&self) -> (usize, usize) {
        let acks = self.inner.pending_acks.sweep(self.inner.config.ack_timeout);
        let responses = self.inner.pending_responses.sweep(self.inner.config.request_timeout);
        (acks, responses)
    }

    pub fn get_connection(&self, user_id: i64) -> Option<Arc<Connection<U>>> {
        self.inner.registry.get(&user_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn is_user_online(&self, user_id: i64) -> bool {
        self.inner.registry.contains_key(&user_id)
    }

    pub async fn send_message_to_user(&self, user_id: i64, envelope: Envelope) -> Result<(), ManagerError> {
        let conn = self.get_connection(user_id).ok_or(ManagerError::NotFound)?;
        conn.send_message(envelope).await.map_err(ManagerError::from)
    }

    /// Sends `envelope` (cloned per recipient) to every currently
    /// registered connection except those in `exclude`. Returns a map of
    /// failures only; a fully successful broadcast returns an empty map.
    pub async fn broadcast_to_all(&self, envelope: Envelope, exclude: &[i64]) -> HashMap<i64, ManagerError> {
        let targets: Vec<i64> = self
            .inner
            .registry
            .iter()
            .map(|entry| *entry.key())
            .filter(|id| !exclude.contains(id))
            .collect();
        self.broadcast_to_users(&targets, envelope, exclude).await
    }

    pub async fn broadcast_to_users(&self, user_ids: &[i64], envelope: Envelope, exclude: &[i64]) -> HashMap<i64, ManagerError> {
        let mut failures = HashMap::new();
        let mut set = JoinSet::new();
        for &user_id in user_ids {
            if exclude.contains(&user_id) {
                continue;
            }
            let Some(conn) = self.get_connection(user_id) else {
                failures.insert(user_id, ManagerError::NotConnected);
                continue;
            };
            let envelope = envelope.clone();
            set.spawn(async move {
                let result = conn.send_message(envelope).await.map_err(ManagerError::from);
                (user_id, result)
            });
        }
        while let Some(joined) = set.join_next().await {
            if let Ok((user_id, Err(err))) = joined {
                failures.insert(user_id, err);
            }
        }
        failures
    }

    /// Sends `envelope` and waits for the matching `client_ack`. Always
    /// removes the pending-ack entry before returning, on every path.
    pub async fn send_for_client_ack(&self, conn: &Connection<U>, mut envelope: Envelope) -> Result<Envelope, ManagerError> {
        let pid = envelope.pid_or_assign();
        let rx = self.inner.pending_acks.insert(pid.clone());
        if let Err(err) = conn.send_message(envelope).await {
            self.inner.pending_acks.remove(&pid);
            return Err(ManagerError::from(WaitError::from(err)));
        }
        let result = tokio::select! {
            received = rx => received.map_err(|_| WaitError::Closed),
            () = tokio::time::sleep(self.inner.config.ack_timeout) => Err(WaitError::AckTimeout),
            () = conn.scope().cancelled() => Err(WaitError::Closed),
        };
        self.inner.pending_acks.remove(&pid);
        result.map_err(ManagerError::from)
    }

    /// Sends `envelope` and waits for a full client reply correlated by
    /// pid, rather than a bare ack.
    pub async fn send_request_and_wait_client_response(&self, conn: &Connection<U>, mut envelope: Envelope) -> Result<Envelope, ManagerError> {
        let pid = envelope.pid_or_assign();
        let rx = self.inner.pending_responses.insert(pid.clone());
        if let Err(err) = conn.send_message(envelope).await {
            self.inner.pending_responses.remove(&pid);
            return Err(ManagerError::from(WaitError::from(err)));
        }
        let result = tokio::select! {
            received = rx => received.map_err(|_| WaitError::Closed),
            () = tokio::time::sleep(self.inner.config.request_timeout) => Err(WaitError::ResponseTimeout),
            () = conn.scope().cancelled() => Err(WaitError::Closed),
        };
        self.inner.pending_responses.remove(&pid);
        result.map_err(ManagerError::from)
    }

    pub(crate) fn deliver_ack(&self, pid: &str, envelope: Envelope) -> bool {
        self.inner.pending_acks.deliver(pid, envelope)
    }

    pub(crate) fn deliver_response(&self, pid: &str, envelope: Envelope) -> bool {
        self.inner.pending_responses.deliver(pid, envelope)
    }

    pub(crate) fn has_pending_response(&self, pid: &str) -> bool {
        self.inner.pending_responses.contains(pid)
    }

    pub fn handler(&self) -> &H {
        &self.inner.handler
    }

    /// Registers `user_id`, evicting any existing connection for the same
    /// id, then spawns the read and write pumps for `socket`. Returns once
    /// the connection is fully torn down.
    pub async fn handle_socket(&self, socket: WebSocket, user_id: i64, user_data: U) {
        if let Some(existing) = self.inner.registry.get(&user_id) {
            info!(user_id, "evicting existing connection on reconnect");
            existing.close();
        }

        let (tx, rx) = tokio::sync::mpsc::channel(self.inner.config.send_channel_buffer);
        let scope = self.inner.scope.child_token();
        let conn = Arc::new(Connection::new(user_id, user_data, tx, scope.clone(), self.inner.config.write_wait));

        if let Err(err) = self.inner.handler.on_connect(conn.as_ref()).await {
            warn!(user_id, %err, "on_connect rejected new connection");
            return;
        }

        self.inner.registry.insert(user_id, Arc::clone(&conn));

        let (ws_sink, ws_stream) = socket.split();
        let manager = self.clone();
        let write_conn_scope = scope.clone();
        let write_config = self.inner.config.clone();
        let write_handle = tokio::spawn(async move {
            run_write_pump(ws_sink, rx, write_conn_scope, write_config).await;
        });

        let read_conn = Arc::clone(&conn);
        let reason = run_read_pump(ws_stream, read_conn, manager).await;

        let _ = write_handle.await;

        self.unregister(user_id, &conn);
        self.inner.handler.on_disconnect(user_id, conn.user_data(), &reason).await;
    }

    /// Removes `user_id` from the registry only if it still points at
    /// `conn` -- a newer connection that evicted this one owns the slot.
    pub(crate) fn unregister(&self, user_id: i64, conn: &Arc<Connection<U>>) {
        if let Some(entry) = self.inner.registry.get(&user_id) {
            if Arc::ptr_eq(entry.value(), conn) {
                drop(entry);
                self.inner.registry.remove(&user_id);
            }
        }
    }

    /// Cancels every connection and waits (up to `deadline`) for their
    /// pumps to exit, then drains both pending tables.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), ManagerError> {
        self.inner.scope.cancel();
        let wait_for_drain = async {
            while !self.inner.registry.is_empty() {
                tokio::time::sleep(Duration::from_millis(25)).await;
            }
        };
        let result = tokio::time::timeout(deadline, wait_for_drain).await;
        self.inner.pending_acks.clear();
        self.inner.pending_responses.clear();
        result.map_err(|_| ManagerError::ShutdownDeadline)
    }
}
