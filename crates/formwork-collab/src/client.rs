//! Realtime subscription
//!
//! ```text
//! Disconnected --connect()--> Connecting --ok--> Connected
//!      ^                          |                  |
//!      +------ failure / backoff -+------------------+
//!
//! any state --close()--> Closed (terminal)
//! ```
//!
//! Without an endpoint the client stays `Disconnected` and `connect()` does
//! nothing. Failed or dropped connections are retried with exponential
//! backoff until `max_reconnect_attempts` consecutive failures.

use chrono::Utc;
use formwork_config::PresenceConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::message::RealtimeMessage;
use crate::presence::{PresenceChange, PresenceTracker};
use crate::transport::{Connector, Transport};

const OUTGOING_CAPACITY: usize = 256;
const INCOMING_CAPACITY: usize = 256;
const MAX_BACKOFF_SHIFT: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delay before reconnect attempt `attempt` (1-based)
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
    base.saturating_mul(1u32 << shift)
}

/// State shared between the handle and the connection task
struct Shared {
    config: PresenceConfig,
    connector: Arc<dyn Connector>,
    tracker: Arc<Mutex<PresenceTracker>>,
    state: watch::Sender<ConnectionState>,
    shutdown: watch::Sender<bool>,
    incoming: broadcast::Sender<RealtimeMessage>,
}

impl Shared {
    /// Move to `next` unless the client is already closed
    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == ConnectionState::Closed || *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            tracing::info!(state = %next, "realtime connection state changed");
        }
    }

    fn is_closed(&self) -> bool {
        *self.state.borrow() == ConnectionState::Closed
    }
}

pub struct RealtimeClient {
    shared: Arc<Shared>,
    outgoing: Mutex<Option<mpsc::Sender<RealtimeMessage>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeClient {
    pub fn new(
        config: PresenceConfig,
        tracker: PresenceTracker,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (shutdown, _) = watch::channel(false);
        let (incoming, _) = broadcast::channel(INCOMING_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                config,
                connector,
                tracker: Arc::new(Mutex::new(tracker)),
                state,
                shutdown,
                incoming,
            }),
            outgoing: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Every message received from peers, including custom events
    pub fn subscribe_messages(&self) -> broadcast::Receiver<RealtimeMessage> {
        self.shared.incoming.subscribe()
    }

    /// Presence state for overlays
    pub fn presence(&self) -> Arc<Mutex<PresenceTracker>> {
        self.shared.tracker.clone()
    }

    /// Start the connection task
    ///
    /// No-op without an endpoint, after `close()`, or while a task is running.
    /// Must be called within a tokio runtime.
    pub fn connect(&self) {
        if self.shared.is_closed() {
            tracing::debug!("connect() after close() ignored");
            return;
        }
        let Some(endpoint) = self.shared.config.endpoint.clone() else {
            tracing::debug!("no realtime endpoint configured, staying disconnected");
            return;
        };

        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let (tx, rx) = mpsc::channel(OUTGOING_CAPACITY);
        *self.outgoing.lock() = Some(tx);
        *task = Some(tokio::spawn(run(self.shared.clone(), endpoint, rx)));
    }

    /// Queue a message for the current connection
    ///
    /// Returns `false` when there is no live connection task to take it.
    pub fn send(&self, message: RealtimeMessage) -> bool {
        match self.outgoing.lock().as_ref() {
            Some(tx) => tx.try_send(message).is_ok(),
            None => false,
        }
    }

    /// Stop for good; later `connect()` calls are ignored
    pub async fn close(&self) {
        self.shared.set_state(ConnectionState::Closed);
        self.shared.shutdown.send_replace(true);
        self.outgoing.lock().take();

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::debug!(error = %e, "realtime task ended abnormally");
            }
        }
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        self.shared.shutdown.send_replace(true);
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }
}

/// How a connected session ended
enum SessionEnd {
    Shutdown,
    Lost,
}

async fn run(
    shared: Arc<Shared>,
    endpoint: String,
    mut outgoing: mpsc::Receiver<RealtimeMessage>,
) {
    let mut shutdown = shared.shutdown.subscribe();
    let mut failures: u32 = 0;

    loop {
        if shared.is_closed() || *shutdown.borrow() {
            return;
        }
        shared.set_state(ConnectionState::Connecting);

        match shared.connector.connect(&endpoint).await {
            Ok(mut transport) => {
                failures = 0;
                shared.set_state(ConnectionState::Connected);
                let end = session(&shared, transport.as_mut(), &mut outgoing, &mut shutdown).await;
                if let SessionEnd::Shutdown = end {
                    let leave = shared.tracker.lock().leave_message(Utc::now());
                    let _ = transport.send(&leave).await;
                    transport.close().await;
                    return;
                }
                shared.tracker.lock().clear_peers();
            }
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "realtime connect failed");
            }
        }

        shared.set_state(ConnectionState::Disconnected);
        failures += 1;
        if failures > shared.config.max_reconnect_attempts {
            tracing::warn!(
                attempts = failures,
                "giving up on realtime connection, staying disconnected"
            );
            return;
        }

        let delay = backoff_delay(shared.config.reconnect_base_delay(), failures);
        tracing::debug!(
            attempt = failures,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => return,
        }
    }
}

async fn session(
    shared: &Shared,
    transport: &mut dyn Transport,
    outgoing: &mut mpsc::Receiver<RealtimeMessage>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let hello = shared.tracker.lock().heartbeat(Utc::now());
    if let Err(e) = transport.send(&hello).await {
        tracing::warn!(error = %e, "realtime send failed");
        return SessionEnd::Lost;
    }

    let mut heartbeat = tokio::time::interval(shared.config.heartbeat_interval());
    // The first tick completes immediately and the hello already went out
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => return SessionEnd::Shutdown,
            queued = outgoing.recv() => {
                let Some(message) = queued else {
                    return SessionEnd::Shutdown;
                };
                if let Err(e) = transport.send(&message).await {
                    tracing::warn!(error = %e, "realtime send failed");
                    return SessionEnd::Lost;
                }
            }
            _ = heartbeat.tick() => {
                let now = Utc::now();
                let beat = {
                    let mut tracker = shared.tracker.lock();
                    tracker.prune(now);
                    tracker.heartbeat(now)
                };
                if let Err(e) = transport.send(&beat).await {
                    tracing::warn!(error = %e, "realtime heartbeat failed");
                    return SessionEnd::Lost;
                }
            }
            received = transport.recv() => match received {
                Ok(Some(message)) => {
                    let change = shared.tracker.lock().apply(&message, Utc::now());
                    if change != PresenceChange::Ignored {
                        tracing::debug!(?change, "presence changed");
                    }
                    // No subscribers is fine
                    let _ = shared.incoming.send(message);
                }
                Ok(None) => {
                    tracing::warn!("realtime peer closed the connection");
                    return SessionEnd::Lost;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "realtime receive failed");
                    return SessionEnd::Lost;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 4), Duration::from_millis(800));
        // Large attempt counts saturate instead of overflowing
        assert!(backoff_delay(base, 200) >= backoff_delay(base, 17));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }
}
