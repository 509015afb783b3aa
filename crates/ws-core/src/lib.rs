//! Generic real-time connection manager: authenticate once at upgrade,
//! then multiplex a single bounded send queue and two correlation tables
//! per connection. Application code supplies a [`dispatch::MessageHandler`]
//! and talks to everyone else through the [`manager::Manager`].

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
mod pending;
mod read;
mod sweeper;
mod write;

pub mod manager;

pub use config::ManagerConfig;
pub use connection::Connection;
pub use dispatch::{DataRequestFn, DataRequestRouter, MessageHandler};
pub use error::{AuthError, ConnectionError, DisconnectReason, HandlerError, ManagerError, WaitError};
pub use manager::Manager;
pub use ws_protocol::{error_codes, reserved_types, AckPayload, DataRequestPayload, Envelope, ErrorPayload};
