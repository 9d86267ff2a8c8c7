//! WebSocket transport: one JSON text frame per message

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::{Connector, Transport, TransportError, TransportResult};
use crate::message::RealtimeMessage;

pub struct WebSocketTransport<S = MaybeTlsStream<TcpStream>> {
    stream: WebSocketStream<S>,
}

impl<S> WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already negotiated WebSocket (client or server side)
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self { stream }
    }
}

impl WebSocketTransport {
    /// Open a client connection to a `ws://` or `wss://` URL
    pub async fn connect(endpoint: &str) -> TransportResult<Self> {
        let (stream, _response) = tokio_tungstenite::connect_async(endpoint)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Self::new(stream))
    }
}

#[async_trait]
impl<S> Transport for WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, message: &RealtimeMessage) -> TransportResult<()> {
        let text = message
            .to_json()
            .map_err(|e| TransportError::Send(e.to_string()))?;
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> TransportResult<Option<RealtimeMessage>> {
        loop {
            match self.stream.next().await {
                None | Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(Message::Text(text))) => match RealtimeMessage::from_json(text.as_str()) {
                    Ok(message) => return Ok(Some(message)),
                    Err(e) => {
                        // One bad frame must not kill the session
                        tracing::warn!(error = %e, "dropping malformed realtime frame");
                    }
                },
                // Pings are answered by the stream itself
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(TransportError::Receive(e.to_string())),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(error = %e, "websocket close failed");
        }
    }
}

/// Opens [`WebSocketTransport`]s for the realtime client
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, endpoint: &str) -> TransportResult<Box<dyn Transport>> {
        Ok(Box::new(WebSocketTransport::connect(endpoint).await?))
    }
}
