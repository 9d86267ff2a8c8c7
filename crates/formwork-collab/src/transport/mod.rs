//! Message transports
//!
//! A [`Transport`] is one live connection; a [`Connector`] opens a new one
//! each time the client (re)connects.

mod channel;
mod websocket;

pub use channel::{ChannelConnector, ChannelTransport};
pub use websocket::{WebSocketConnector, WebSocketTransport};

use async_trait::async_trait;
use thiserror::Error;

use crate::message::RealtimeMessage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Connection closed")]
    Closed,
}

pub type TransportResult<T> = Result<T, TransportError>;

#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, message: &RealtimeMessage) -> TransportResult<()>;

    /// Next message; `Ok(None)` once the peer has closed the connection
    async fn recv(&mut self) -> TransportResult<Option<RealtimeMessage>>;

    async fn close(&mut self);
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> TransportResult<Box<dyn Transport>>;
}
