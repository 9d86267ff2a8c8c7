//! In-process transport over tokio channels

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

use super::{Connector, Transport, TransportError, TransportResult};
use crate::message::RealtimeMessage;

const CHANNEL_CAPACITY: usize = 64;

/// One end of an in-memory connection
#[derive(Debug)]
pub struct ChannelTransport {
    tx: Option<mpsc::Sender<RealtimeMessage>>,
    rx: mpsc::Receiver<RealtimeMessage>,
}

impl ChannelTransport {
    /// Two connected ends
    pub fn pair() -> (ChannelTransport, ChannelTransport) {
        let (a_tx, a_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (b_tx, b_rx) = mpsc::channel(CHANNEL_CAPACITY);
        (
            ChannelTransport {
                tx: Some(a_tx),
                rx: b_rx,
            },
            ChannelTransport {
                tx: Some(b_tx),
                rx: a_rx,
            },
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&mut self, message: &RealtimeMessage) -> TransportResult<()> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(message.clone())
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> TransportResult<Option<RealtimeMessage>> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) {
        // Dropping the sender ends the peer's stream
        self.tx = None;
        self.rx.close();
    }
}

/// Hands out prepared connection results in order
///
/// Once the queue is empty every further attempt fails.
#[derive(Debug, Default)]
pub struct ChannelConnector {
    pending: Mutex<VecDeque<TransportResult<ChannelTransport>>>,
    attempts: AtomicUsize,
}

impl ChannelConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful connection; returns the server end
    pub fn accept_next(&self) -> ChannelTransport {
        let (client, server) = ChannelTransport::pair();
        self.pending.lock().push_back(Ok(client));
        server
    }

    /// Queue a failed connection attempt
    pub fn fail_next(&self, message: impl Into<String>) {
        self.pending
            .lock()
            .push_back(Err(TransportError::Connect(message.into())));
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ChannelConnector {
    async fn connect(&self, endpoint: &str) -> TransportResult<Box<dyn Transport>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.pending.lock().pop_front();
        match next {
            Some(Ok(transport)) => Ok(Box::new(transport)),
            Some(Err(err)) => Err(err),
            None => Err(TransportError::Connect(format!("{} is unreachable", endpoint))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_delivers_both_ways() {
        let (mut a, mut b) = ChannelTransport::pair();
        let msg = RealtimeMessage::custom("hello", serde_json::Value::Null);
        a.send(&msg).await.unwrap();
        assert_eq!(b.recv().await.unwrap(), Some(msg.clone()));
        b.send(&msg).await.unwrap();
        assert_eq!(a.recv().await.unwrap(), Some(msg));
    }

    #[tokio::test]
    async fn test_close_ends_peer_stream() {
        let (mut a, mut b) = ChannelTransport::pair();
        a.close().await;
        assert_eq!(b.recv().await.unwrap(), None);
        let msg = RealtimeMessage::custom("late", serde_json::Value::Null);
        assert_eq!(a.send(&msg).await, Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn test_connector_queue() {
        let connector = ChannelConnector::new();
        connector.fail_next("refused");
        let _server = connector.accept_next();

        assert!(connector.connect("mem://a").await.is_err());
        assert!(connector.connect("mem://a").await.is_ok());
        assert!(connector.connect("mem://a").await.is_err());
        assert_eq!(connector.attempts(), 3);
    }
}
