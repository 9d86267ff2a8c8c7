//! # Formwork Collab
//!
//! Realtime collaboration for Formwork sessions:
//!
//! - [`PresenceTracker`]: who else is here, their status and cursor
//! - [`RealtimeClient`]: connection state machine with reconnect backoff
//! - [`transport`]: in-memory channels for tests and in-process hosts, and
//!   WebSocket for everything else

pub mod client;
pub mod message;
pub mod presence;
pub mod transport;

pub use client::{backoff_delay, ConnectionState, RealtimeClient};
pub use message::{CursorPosition, PresenceStatus, RealtimeMessage};
pub use presence::{color_for, PresenceChange, PresenceTracker, PresenceUser};
pub use transport::{
    ChannelConnector, ChannelTransport, Connector, Transport, TransportError, TransportResult,
    WebSocketConnector, WebSocketTransport,
};
