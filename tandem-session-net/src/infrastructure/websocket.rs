use crate::infrastructure::error::TransportError;
use crate::infrastructure::transport::Transport;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Relay connection over a WebSocket, one JSON text frame per message
#[derive(Default)]
pub struct WebSocketTransport {
    stream: Option<WsStream>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&mut self, endpoint: &str) -> Result<(), TransportError> {
        if self.stream.is_some() {
            self.close().await;
        }

        let (stream, _response) = connect_async(endpoint)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        tracing::info!(endpoint, "websocket connected");
        self.stream = Some(stream);
        Ok(())
    }

    async fn send(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let text = String::from_utf8(bytes).map_err(|e| TransportError::Malformed(e.to_string()))?;

        if let Err(e) = stream.send(Message::Text(text.into())).await {
            tracing::warn!(error = %e, "websocket send failed");
            self.stream = None;
            return Err(TransportError::SendFailed(e.to_string()));
        }
        Ok(())
    }

    async fn recv(&mut self) -> Option<Vec<u8>> {
        loop {
            let stream = self.stream.as_mut()?;
            let frame = stream.next().await;

            match frame {
                Some(Ok(Message::Text(text))) => return Some(text.as_bytes().to_vec()),
                Some(Ok(Message::Binary(data))) => return Some(data.to_vec()),
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "websocket closed by relay");
                }
                // Pings are answered by tungstenite itself
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "websocket receive failed");
                }
                None => {}
            }

            self.stream = None;
            return None;
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close(None).await {
                tracing::debug!(error = %e, "websocket close handshake failed");
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_before_connect() {
        let mut transport = WebSocketTransport::new();

        assert!(!transport.is_connected());
        assert_eq!(
            transport.send(b"{}".to_vec()).await,
            Err(TransportError::NotConnected)
        );
        assert_eq!(transport.recv().await, None);
    }

    #[tokio::test]
    async fn test_connect_to_invalid_endpoint() {
        let mut transport = WebSocketTransport::new();

        let result = transport.connect("not a url").await;

        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
        assert!(!transport.is_connected());
    }
}
