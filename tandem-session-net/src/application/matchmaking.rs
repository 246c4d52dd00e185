use crate::application::SessionConfig;
use crate::domain::{Payload, RelayCommand, RelayEvent};
use crate::infrastructure::error::{MatchError, RoomError, TransportError};
use crate::infrastructure::transport::Transport;
use std::fmt;
use std::time::Duration;
use tandem_session_core::{PeerId, RoomCode};
use tokio::time::{interval_at, timeout, Instant, Interval, MissedTickBehavior};

/// An established partner connection and the transport bound to it
pub struct PeerHandle {
    id: PeerId,
    is_primary: bool,
    transport: Box<dyn Transport>,
}

impl PeerHandle {
    pub fn new(is_primary: bool, transport: Box<dyn Transport>) -> Self {
        Self {
            id: PeerId::new(),
            is_primary,
            transport,
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub async fn send_payload(&mut self, payload: Payload) -> Result<(), TransportError> {
        send_command(self.transport.as_mut(), &RelayCommand::Push { payload }).await
    }

    pub async fn send_command(&mut self, command: &RelayCommand) -> Result<(), TransportError> {
        send_command(self.transport.as_mut(), command).await
    }

    /// Next relay event; `None` once the connection is gone
    ///
    /// Malformed frames are logged and skipped. Cancel safe.
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        loop {
            let bytes = self.transport.recv().await?;
            match RelayEvent::decode(&bytes) {
                Ok(event) => return Some(event),
                Err(e) => tracing::warn!(peer = %self.id, error = %e, "skipping malformed relay frame"),
            }
        }
    }

    /// Tell the relay we are leaving and close the transport
    pub async fn close(mut self) {
        leave(self.transport.as_mut()).await;
    }
}

impl fmt::Debug for PeerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerHandle")
            .field("id", &self.id)
            .field("is_primary", &self.is_primary)
            .field("connected", &self.transport.is_connected())
            .finish()
    }
}

async fn send_command(
    transport: &mut dyn Transport,
    command: &RelayCommand,
) -> Result<(), TransportError> {
    tracing::debug!(?command, "relay send");
    transport.send(command.encode()?).await
}

async fn leave(transport: &mut dyn Transport) {
    if transport.is_connected() {
        if let Err(e) = send_command(transport, &RelayCommand::Leave).await {
            tracing::debug!(error = %e, "leave not delivered");
        }
    }
    transport.close().await;
}

/// Resolves random matches and rooms into partner connections
///
/// Every operation is an ordinary future. Dropping it cancels the request
/// and, because the future owns or borrows the transport, abandons the
/// relay connection with it.
#[derive(Debug, Clone)]
pub struct MatchmakingClient {
    endpoint: String,
    match_timeout: Duration,
    room_ttl: Duration,
    heartbeat_interval: Duration,
}

impl MatchmakingClient {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            endpoint: config.relay_url.clone(),
            match_timeout: config.match_timeout,
            room_ttl: config.room_ttl,
            heartbeat_interval: config.heartbeat_interval,
        }
    }

    /// Pair with whoever is waiting, or wait to be picked
    pub async fn find_random(
        &self,
        mut transport: Box<dyn Transport>,
    ) -> Result<PeerHandle, MatchError> {
        self.open(transport.as_mut()).await?;
        send_command(transport.as_mut(), &RelayCommand::JoinRandom).await?;

        let joined = self.wait_for(transport.as_mut(), self.match_timeout, |event| match event {
            RelayEvent::Joined { is_primary } => Some(is_primary),
            _ => None,
        });

        match joined.await {
            Some(Ok(is_primary)) => {
                tracing::info!(is_primary, "random match found");
                Ok(PeerHandle::new(is_primary, transport))
            }
            Some(Err(e)) => Err(e.into()),
            None => {
                leave(transport.as_mut()).await;
                Err(MatchError::NoPeer {
                    waited: self.match_timeout,
                })
            }
        }
    }

    /// Open a room under `code` on the relay
    pub async fn host_room(
        &self,
        transport: &mut dyn Transport,
        code: &RoomCode,
    ) -> Result<(), RoomError> {
        self.open(transport).await?;
        send_command(transport, &RelayCommand::CreateRoom { key: code.clone() }).await?;

        let created = self.wait_for(transport, self.match_timeout, |event| match event {
            RelayEvent::RoomCreated { key } if key == *code => Some(Ok(())),
            RelayEvent::RoomTaken { key } => Some(Err(RoomError::Taken { code: key })),
            _ => None,
        });

        match created.await {
            Some(Ok(result)) => {
                if result.is_ok() {
                    tracing::info!(%code, "room opened");
                }
                result
            }
            Some(Err(e)) => Err(e.into()),
            None => Err(RoomError::Transport(TransportError::ConnectionFailed(
                "relay did not confirm the room".to_string(),
            ))),
        }
    }

    /// Wait for a guest to join the hosted room, for at most the room TTL
    pub async fn await_guest(
        &self,
        mut transport: Box<dyn Transport>,
        code: &RoomCode,
    ) -> Result<PeerHandle, RoomError> {
        let joined = self.wait_for(transport.as_mut(), self.room_ttl, |event| match event {
            RelayEvent::Joined { is_primary } => Some(is_primary),
            _ => None,
        });

        match joined.await {
            Some(Ok(is_primary)) => {
                tracing::info!(%code, "guest joined room");
                Ok(PeerHandle::new(is_primary, transport))
            }
            Some(Err(e)) => Err(e.into()),
            None => {
                tracing::info!(%code, "room expired without a guest");
                leave(transport.as_mut()).await;
                Err(RoomError::Expired { code: code.clone() })
            }
        }
    }

    /// Join the room someone else is hosting under `code`
    pub async fn join_room(
        &self,
        mut transport: Box<dyn Transport>,
        code: &RoomCode,
    ) -> Result<PeerHandle, RoomError> {
        self.open(transport.as_mut()).await?;
        send_command(transport.as_mut(), &RelayCommand::JoinRoom { key: code.clone() }).await?;

        let answer = self.wait_for(transport.as_mut(), self.match_timeout, |event| match event {
            RelayEvent::Joined { is_primary } => Some(Ok(is_primary)),
            RelayEvent::NotFound => Some(Err(RoomError::NotFound { code: code.clone() })),
            RelayEvent::Expired => Some(Err(RoomError::Expired { code: code.clone() })),
            _ => None,
        });

        match answer.await {
            Some(Ok(Ok(is_primary))) => {
                tracing::info!(%code, "joined room");
                Ok(PeerHandle::new(is_primary, transport))
            }
            Some(Ok(Err(e))) => Err(e),
            Some(Err(e)) => Err(e.into()),
            None => {
                leave(transport.as_mut()).await;
                Err(RoomError::NotFound { code: code.clone() })
            }
        }
    }

    async fn open(&self, transport: &mut dyn Transport) -> Result<(), TransportError> {
        if !transport.is_connected() {
            transport.connect(&self.endpoint).await?;
        }
        Ok(())
    }

    fn heartbeat(&self) -> Interval {
        let period = self.heartbeat_interval.max(Duration::from_millis(1));
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    /// Read events until `accept` picks one, keeping the relay alive meanwhile
    ///
    /// Returns `None` when `limit` elapses first.
    async fn wait_for<T>(
        &self,
        transport: &mut dyn Transport,
        limit: Duration,
        mut accept: impl FnMut(RelayEvent) -> Option<T> + Send,
    ) -> Option<Result<T, TransportError>> {
        let mut heartbeat = self.heartbeat();

        let wait = async {
            loop {
                tokio::select! {
                    bytes = transport.recv() => {
                        let Some(bytes) = bytes else {
                            return Err(TransportError::Closed);
                        };
                        match RelayEvent::decode(&bytes) {
                            Ok(event) => {
                                tracing::debug!(?event, "relay event");
                                if let Some(accepted) = accept(event) {
                                    return Ok(accepted);
                                }
                            }
                            Err(e) => tracing::warn!(error = %e, "skipping malformed relay frame"),
                        }
                    }
                    _ = heartbeat.tick() => {
                        send_command(transport, &RelayCommand::HeartBeat).await?;
                    }
                }
            }
        };

        timeout(limit, wait).await.ok()
    }
}
