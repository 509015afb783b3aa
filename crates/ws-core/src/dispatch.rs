use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use ws_protocol::Envelope;

use crate::connection::Connection;
use crate::error::{DisconnectReason, HandlerError};
use crate::manager::Manager;

/// Application-supplied logic invoked by the read pump for every inbound
/// envelope that isn't an ack or a correlated response.
///
/// A dispatch error never closes the connection: the read pump turns it
/// into an `error_notification` sent back to the same client.
#[async_trait]
pub trait MessageHandler<U>: Send + Sync {
    async fn dispatch(
        &self,
        conn: Arc<Connection<U>>,
        manager: &Manager<U, Self>,
        envelope: Envelope,
    ) -> Result<(), HandlerError>
    where
        Self: Sized;

    /// Called once a connection has been registered, before its pumps
    /// start. Returning an error aborts the upgrade and closes the socket.
    async fn on_connect(&self, _conn: &Connection<U>) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Called exactly once per connection after its pumps have exited,
    /// with the error that terminated the read pump.
    async fn on_disconnect(&self, _user_id: i64, _user_data: &U, _reason: &DisconnectReason) {}
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A handler for one `(resource, action)` pair of the reserved
/// `data_request` envelope type. Receives a manager handle (cheap to
/// clone) so it can reach registry-level operations such as presence
/// checks or targeted sends.
pub type DataRequestFn<U, H> = Arc<
    dyn Fn(Arc<Connection<U>>, Manager<U, H>, Option<serde_json::Value>) -> BoxFuture<Result<serde_json::Value, HandlerError>>
        + Send
        + Sync,
>;

/// An indexed table routing `data_request` envelopes by `(resource,
/// action)`. Application code registers handlers at startup; the façade
/// looks them up per inbound request and reports no match (so the caller
/// can raise `UnknownAction`) when none fits.
pub struct DataRequestRouter<U, H> {
    routes: RwLock<HashMap<(String, String), DataRequestFn<U, H>>>,
}

impl<U, H> DataRequestRouter<U, H> {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, resource: impl Into<String>, action: impl Into<String>, handler: DataRequestFn<U, H>) {
        self.routes
            .write()
            .insert((resource.into(), action.into()), handler);
    }

    pub async fn dispatch(
        &self,
        conn: Arc<Connection<U>>,
        manager: Manager<U, H>,
        resource: &str,
        action: &str,
        data: Option<serde_json::Value>,
    ) -> Option<Result<serde_json::Value, HandlerError>> {
        let handler = self
            .routes
            .read()
            .get(&(resource.to_string(), action.to_string()))
            .cloned()?;
        Some(handler(conn, manager, data).await)
    }
}

impl<U, H> Default for DataRequestRouter<U, H> {
    fn default() -> Self {
        Self::new()
    }
}
