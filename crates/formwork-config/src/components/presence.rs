//! Realtime presence configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Presence and realtime subscription configuration
///
/// Leaving `endpoint` unset keeps the subscription permanently disconnected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PresenceConfig {
    /// WebSocket endpoint (`ws://` or `wss://`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Interval between local heartbeats
    pub heartbeat_interval_ms: u64,
    /// Peers silent for longer than this are pruned
    pub timeout_ms: u64,
    /// First reconnect delay, doubled on every further attempt
    pub reconnect_base_delay_ms: u64,
    /// Reconnect attempts before staying disconnected
    pub max_reconnect_attempts: u32,
}

impl PresenceConfig {
    /// Heartbeat interval as a [`Duration`]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Peer timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base reconnect delay as a [`Duration`]
    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms)
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            heartbeat_interval_ms: 10_000,
            timeout_ms: 30_000,
            reconnect_base_delay_ms: 500,
            max_reconnect_attempts: 5,
        }
    }
}
