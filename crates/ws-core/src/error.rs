use thiserror::Error;

/// Failure modes of a single send onto a connection's outbound queue.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("connection is closed")]
    Closed,
    #[error("send queue did not accept the message in time")]
    Timeout,
}

/// Failure modes of waiting for a correlated client ack or response.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    #[error("no client ack arrived before the ack timeout")]
    AckTimeout,
    #[error("no client response arrived before the request timeout")]
    ResponseTimeout,
    #[error("connection closed while waiting for a reply")]
    Closed,
    #[error(transparent)]
    Send(#[from] ConnectionError),
}

/// Failures surfaced by manager-level registry operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManagerError {
    #[error("no connection registered for this user")]
    NotFound,
    #[error("user is not connected")]
    NotConnected,
    #[error("shutdown deadline elapsed before all connections drained")]
    ShutdownDeadline,
    #[error(transparent)]
    Wait(#[from] WaitError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// An error returned by an application dispatch handler. Never fatal to
/// the connection; reported to the client as an `error_notification`.
#[derive(Debug, Error, Clone)]
#[error("{message}")]
pub struct HandlerError {
    pub code: i32,
    pub message: String,
}

impl HandlerError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Rejection of a WebSocket upgrade before any connection exists.
#[derive(Debug, Error, Clone)]
#[error("{0}")]
pub struct AuthError(pub String);

/// Why a connection's read pump stopped; passed to `on_disconnect` as the
/// terminating error for that connection.
#[derive(Debug, Error, Clone)]
pub enum DisconnectReason {
    #[error("connection scope was cancelled (evicted or manager shutting down)")]
    ScopeCancelled,
    #[error("peer closed the connection")]
    PeerClosed,
    #[error("no pong arrived before the read deadline")]
    PongTimeout,
    #[error("websocket read error: {0}")]
    ReadError(String),
}
