use crate::infrastructure::error::TransportError;
use crate::infrastructure::relay_hub::RelayHub;
use crate::infrastructure::transport::Transport;
use async_trait::async_trait;
use tandem_session_core::PeerId;
use tokio::sync::mpsc;

#[derive(Debug)]
struct Link {
    id: PeerId,
    inbox: mpsc::UnboundedReceiver<Vec<u8>>,
}

/// Transport attached to an in-process [`RelayHub`]
///
/// The endpoint passed to `connect` is ignored. Dropping a connected
/// transport disconnects it from the hub.
#[derive(Debug)]
pub struct MemoryTransport {
    hub: RelayHub,
    link: Option<Link>,
}

impl MemoryTransport {
    pub fn new(hub: RelayHub) -> Self {
        Self { hub, link: None }
    }

    /// Hub-side id of the current connection
    pub fn client_id(&self) -> Option<PeerId> {
        self.link.as_ref().map(|link| link.id)
    }

    fn detach(&mut self) {
        if let Some(link) = self.link.take() {
            self.hub.disconnect(link.id);
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&mut self, endpoint: &str) -> Result<(), TransportError> {
        self.detach();

        let (tx, inbox) = mpsc::unbounded_channel();
        let id = self.hub.register(tx).ok_or_else(|| {
            TransportError::ConnectionFailed(format!("relay at {endpoint} refused the connection"))
        })?;

        tracing::debug!(client = %id, "memory transport connected");
        self.link = Some(Link { id, inbox });
        Ok(())
    }

    async fn send(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        let id = self
            .link
            .as_ref()
            .map(|link| link.id)
            .ok_or(TransportError::NotConnected)?;

        if !self.hub.is_registered(id) {
            self.link = None;
            return Err(TransportError::Closed);
        }

        self.hub.handle(id, &bytes);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Vec<u8>> {
        let link = self.link.as_mut()?;
        let received = link.inbox.recv().await;

        match received {
            Some(bytes) => Some(bytes),
            None => {
                self.link = None;
                None
            }
        }
    }

    async fn close(&mut self) {
        self.detach();
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RelayCommand, RelayEvent};

    #[tokio::test]
    async fn test_connect_send_recv() {
        let hub = RelayHub::new();
        let mut a = MemoryTransport::new(hub.clone());
        let mut b = MemoryTransport::new(hub.clone());

        a.connect("memory").await.unwrap();
        b.connect("memory").await.unwrap();
        assert_eq!(hub.client_count(), 2);

        a.send(RelayCommand::JoinRandom.encode().unwrap()).await.unwrap();
        b.send(RelayCommand::JoinRandom.encode().unwrap()).await.unwrap();

        let event = RelayEvent::decode(&b.recv().await.unwrap()).unwrap();
        assert_eq!(event, RelayEvent::Joined { is_primary: false });
    }

    #[tokio::test]
    async fn test_drop_disconnects() {
        let hub = RelayHub::new();
        {
            let mut transport = MemoryTransport::new(hub.clone());
            transport.connect("memory").await.unwrap();
            assert_eq!(hub.client_count(), 1);
        }
        assert_eq!(hub.client_count(), 0);
    }

    #[tokio::test]
    async fn test_relay_drop_ends_sequence() {
        let hub = RelayHub::new();
        let mut transport = MemoryTransport::new(hub.clone());
        transport.connect("memory").await.unwrap();

        hub.disconnect_all();

        assert_eq!(transport.recv().await, None);
        assert!(!transport.is_connected());
        assert_eq!(
            transport.send(b"{}".to_vec()).await,
            Err(TransportError::NotConnected)
        );
    }

    #[tokio::test]
    async fn test_send_after_relay_drop_fails() {
        let hub = RelayHub::new();
        let mut transport = MemoryTransport::new(hub.clone());
        transport.connect("memory").await.unwrap();

        hub.disconnect_all();

        assert_eq!(
            transport.send(RelayCommand::HeartBeat.encode().unwrap()).await,
            Err(TransportError::Closed)
        );
    }

    #[tokio::test]
    async fn test_reconnect_starts_new_sequence() {
        let hub = RelayHub::new();
        let mut transport = MemoryTransport::new(hub.clone());

        transport.connect("memory").await.unwrap();
        let first = transport.client_id().unwrap();
        transport.connect("memory").await.unwrap();
        let second = transport.client_id().unwrap();

        assert_ne!(first, second);
        assert_eq!(hub.client_count(), 1);
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let hub = RelayHub::new();
        hub.set_refuse_connections(true);
        let mut transport = MemoryTransport::new(hub);

        let result = transport.connect("memory").await;

        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
    }
}
