use crate::infrastructure::error::{CliError, Result};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tandem_session_net::RelayHub;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// WebSocket front end for a [`RelayHub`]
///
/// Each connection becomes one hub client. Frames are JSON text in both
/// directions.
pub struct RelayServer {
    hub: RelayHub,
    listener: TcpListener,
    address: SocketAddr,
}

impl RelayServer {
    pub async fn bind(hub: RelayHub, address: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| CliError::Bind { address, source })?;
        let address = listener.local_addr()?;

        tracing::info!(%address, "relay listening");
        Ok(Self {
            hub,
            listener,
            address,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    pub fn hub(&self) -> &RelayHub {
        &self.hub
    }

    /// Accept connections until the listener fails
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let hub = self.hub.clone();

            tokio::spawn(async move {
                serve_connection(hub, stream, peer).await;
            });
        }
    }
}

async fn serve_connection(hub: RelayHub, stream: TcpStream, peer: SocketAddr) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            tracing::warn!(%peer, error = %e, "websocket handshake failed");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();

    let Some(client) = hub.register(tx) else {
        tracing::info!(%peer, "relay refusing connection");
        let _ = ws_sender.close().await;
        return;
    };
    tracing::info!(%peer, %client, "relay client connected");

    // Outgoing frames; ends once the hub drops the client's sender
    let writer = tokio::spawn(async move {
        while let Some(bytes) = rx.recv().await {
            let text = match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "relay produced a non-UTF-8 frame");
                    continue;
                }
            };
            if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                tracing::debug!(error = %e, "failed to write relay frame");
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => hub.handle(client, text.as_bytes()),
            Ok(Message::Binary(data)) => hub.handle(client, &data),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(%client, error = %e, "relay client read failed");
                break;
            }
        }
    }

    hub.disconnect(client);
    let _ = writer.await;
    tracing::info!(%peer, %client, "relay client disconnected");
}
