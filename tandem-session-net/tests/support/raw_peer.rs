use std::time::Duration;
use tandem_session_core::{PeerId, RoomCode};
use tandem_session_net::{MemoryTransport, Payload, RelayCommand, RelayEvent, RelayHub, Transport};

/// Relay client driven by hand from a test, standing in for the partner
pub struct RawPeer {
    transport: MemoryTransport,
}

impl RawPeer {
    pub async fn connect(hub: &RelayHub) -> Self {
        let mut transport = MemoryTransport::new(hub.clone());
        transport.connect("memory://relay").await.unwrap();
        Self { transport }
    }

    pub fn id(&self) -> PeerId {
        self.transport.client_id().unwrap()
    }

    pub async fn send(&mut self, command: RelayCommand) {
        self.transport.send(command.encode().unwrap()).await.unwrap();
    }

    pub async fn join_random(&mut self) {
        self.send(RelayCommand::JoinRandom).await;
    }

    pub async fn create_room(&mut self, key: &RoomCode) {
        self.send(RelayCommand::CreateRoom { key: key.clone() }).await;
    }

    pub async fn join_room(&mut self, key: &RoomCode) {
        self.send(RelayCommand::JoinRoom { key: key.clone() }).await;
    }

    pub async fn push(&mut self, payload: Payload) {
        self.send(RelayCommand::Push { payload }).await;
    }

    pub async fn say(&mut self, text: &str) {
        self.push(Payload::Text(text.to_string())).await;
    }

    pub async fn leave(&mut self) {
        self.send(RelayCommand::Leave).await;
    }

    /// Next event, or `None` once the relay dropped us
    pub async fn try_recv(&mut self) -> Option<RelayEvent> {
        let bytes = tokio::time::timeout(Duration::from_secs(5), self.transport.recv())
            .await
            .expect("timed out waiting for a relay event")?;
        Some(RelayEvent::decode(&bytes).unwrap())
    }

    pub async fn recv(&mut self) -> RelayEvent {
        self.try_recv().await.expect("relay connection closed")
    }

    pub async fn expect_joined(&mut self) -> bool {
        match self.recv().await {
            RelayEvent::Joined { is_primary } => is_primary,
            other => panic!("expected Joined, got {other:?}"),
        }
    }

    pub async fn expect_name(&mut self, name: &str) {
        assert_eq!(
            self.recv().await,
            RelayEvent::Push {
                payload: Payload::Name(name.to_string())
            }
        );
    }

    pub async fn expect_text(&mut self, text: &str) {
        assert_eq!(
            self.recv().await,
            RelayEvent::Push {
                payload: Payload::Text(text.to_string())
            }
        );
    }

    /// The hub-side id of the other client attached to `hub`
    pub fn other_client(&self, hub: &RelayHub) -> PeerId {
        let me = self.id();
        hub.client_ids()
            .into_iter()
            .find(|id| *id != me)
            .expect("no other client on the relay")
    }
}
