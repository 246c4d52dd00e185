use crate::domain::{RelayCommand, RelayEvent};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tandem_session_core::{PeerId, RoomCode};
use tokio::sync::mpsc;

/// Outbound frames for one relay client
pub type ClientSender = mpsc::UnboundedSender<Vec<u8>>;

/// Retired room codes remembered before the oldest are forgotten
pub const DEFAULT_RETIRED_LIMIT: usize = 50_000;

#[derive(Debug)]
struct Client {
    sender: ClientSender,
    partner: Option<PeerId>,
    hosting: Option<RoomCode>,
}

#[derive(Debug, Default)]
struct HubState {
    clients: HashMap<PeerId, Client>,
    /// Random joiners in arrival order
    waiting: VecDeque<PeerId>,
    /// Open rooms by code, mapped to their host
    rooms: HashMap<RoomCode, PeerId>,
    /// Codes that were used or abandoned and cannot be opened again
    retired: RetiredCodes,
    refuse_connections: bool,
}

/// Recently retired room codes, oldest evicted first once `limit` is reached
#[derive(Debug)]
struct RetiredCodes {
    codes: HashSet<RoomCode>,
    order: VecDeque<RoomCode>,
    limit: usize,
}

impl Default for RetiredCodes {
    fn default() -> Self {
        Self::with_limit(DEFAULT_RETIRED_LIMIT)
    }
}

impl RetiredCodes {
    fn with_limit(limit: usize) -> Self {
        Self {
            codes: HashSet::new(),
            order: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    fn contains(&self, code: &RoomCode) -> bool {
        self.codes.contains(code)
    }

    fn insert(&mut self, code: RoomCode) {
        if !self.codes.insert(code.clone()) {
            return;
        }
        self.order.push_back(code);
        while self.order.len() > self.limit {
            if let Some(oldest) = self.order.pop_front() {
                self.codes.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// In-process rendezvous service
///
/// Pairs random joiners first come first served, opens rooms by code and
/// forwards `Push` frames between partners. Handling is synchronous: by the
/// time [`RelayHub::handle`] returns, every resulting event sits in the
/// recipients' queues. Cloning yields another handle to the same hub.
#[derive(Debug, Clone, Default)]
pub struct RelayHub {
    inner: Arc<Mutex<HubState>>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub that remembers at most `limit` retired room codes
    ///
    /// A forgotten code answers `NotFound` instead of `Expired` and may be
    /// hosted again.
    pub fn with_retired_limit(limit: usize) -> Self {
        let state = HubState {
            retired: RetiredCodes::with_limit(limit),
            ..Default::default()
        };
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Attach a client; `None` while the hub refuses connections
    pub fn register(&self, sender: ClientSender) -> Option<PeerId> {
        let mut state = self.state();
        if state.refuse_connections {
            return None;
        }

        let id = PeerId::new();
        state.clients.insert(
            id,
            Client {
                sender,
                partner: None,
                hosting: None,
            },
        );
        tracing::debug!(client = %id, "relay client registered");
        Some(id)
    }

    pub fn is_registered(&self, client: PeerId) -> bool {
        self.state().clients.contains_key(&client)
    }

    /// Decode and apply one frame from `client`
    pub fn handle(&self, client: PeerId, bytes: &[u8]) {
        match RelayCommand::decode(bytes) {
            Ok(command) => self.handle_command(client, command),
            Err(e) => tracing::warn!(client = %client, error = %e, "dropping malformed relay frame"),
        }
    }

    pub fn handle_command(&self, client: PeerId, command: RelayCommand) {
        let mut state = self.state();
        if !state.clients.contains_key(&client) {
            tracing::debug!(client = %client, "frame from unknown client");
            return;
        }

        tracing::debug!(client = %client, ?command, "relay command");
        match command {
            RelayCommand::HeartBeat => {}
            RelayCommand::JoinRandom => state.join_random(client),
            RelayCommand::CreateRoom { key } => state.create_room(client, key),
            RelayCommand::JoinRoom { key } => state.join_room(client, key),
            RelayCommand::Leave => state.leave(client),
            RelayCommand::Push { payload } => {
                match state.partner_of(client) {
                    Some(partner) => state.send(partner, &RelayEvent::Push { payload }),
                    None => tracing::debug!(client = %client, "push without partner dropped"),
                }
            }
        }
    }

    /// Detach a client, notifying its partner and retiring its room
    pub fn disconnect(&self, client: PeerId) {
        let mut state = self.state();
        state.leave(client);
        if state.clients.remove(&client).is_some() {
            tracing::debug!(client = %client, "relay client disconnected");
        }
    }

    /// Drop every client connection at once, as if the relay restarted
    pub fn disconnect_all(&self) {
        let ids: Vec<PeerId> = self.state().clients.keys().copied().collect();
        for id in ids {
            self.disconnect(id);
        }
    }

    pub fn set_refuse_connections(&self, refuse: bool) {
        self.state().refuse_connections = refuse;
    }

    pub fn client_count(&self) -> usize {
        self.state().clients.len()
    }

    pub fn client_ids(&self) -> Vec<PeerId> {
        self.state().clients.keys().copied().collect()
    }

    pub fn waiting_count(&self) -> usize {
        self.state().waiting.len()
    }

    pub fn open_room_count(&self) -> usize {
        self.state().rooms.len()
    }

    pub fn is_retired(&self, code: &RoomCode) -> bool {
        self.state().retired.contains(code)
    }

    pub fn retired_count(&self) -> usize {
        self.state().retired.len()
    }
}

impl HubState {
    fn send(&self, client: PeerId, event: &RelayEvent) {
        let Some(target) = self.clients.get(&client) else {
            return;
        };
        match event.encode() {
            Ok(bytes) => {
                // A closed receiver means the client is about to disconnect
                let _ = target.sender.send(bytes);
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode relay event"),
        }
    }

    fn partner_of(&self, client: PeerId) -> Option<PeerId> {
        self.clients.get(&client).and_then(|c| c.partner)
    }

    fn is_free(&self, client: PeerId) -> bool {
        self.clients
            .get(&client)
            .is_some_and(|c| c.partner.is_none() && c.hosting.is_none())
    }

    fn pair(&mut self, primary: PeerId, secondary: PeerId) {
        for (id, partner) in [(primary, secondary), (secondary, primary)] {
            if let Some(c) = self.clients.get_mut(&id) {
                c.partner = Some(partner);
            }
        }
        self.send(primary, &RelayEvent::Joined { is_primary: true });
        self.send(secondary, &RelayEvent::Joined { is_primary: false });
        tracing::info!(%primary, %secondary, "relay paired clients");
    }

    fn join_random(&mut self, client: PeerId) {
        if !self.is_free(client) || self.waiting.contains(&client) {
            return;
        }

        while let Some(waiter) = self.waiting.pop_front() {
            if self.is_free(waiter) {
                self.pair(waiter, client);
                return;
            }
        }
        self.waiting.push_back(client);
    }

    fn create_room(&mut self, client: PeerId, key: RoomCode) {
        if !self.is_free(client) || self.rooms.contains_key(&key) || self.retired.contains(&key) {
            self.send(client, &RelayEvent::RoomTaken { key });
            return;
        }

        self.waiting.retain(|id| *id != client);
        self.rooms.insert(key.clone(), client);
        if let Some(c) = self.clients.get_mut(&client) {
            c.hosting = Some(key.clone());
        }
        self.send(client, &RelayEvent::RoomCreated { key });
    }

    fn join_room(&mut self, client: PeerId, key: RoomCode) {
        let host = match self.rooms.get(&key) {
            Some(host) if *host != client && self.is_free(client) => *host,
            Some(_) => {
                self.send(client, &RelayEvent::NotFound);
                return;
            }
            None if self.retired.contains(&key) => {
                self.send(client, &RelayEvent::Expired);
                return;
            }
            None => {
                self.send(client, &RelayEvent::NotFound);
                return;
            }
        };

        self.rooms.remove(&key);
        self.retired.insert(key);
        if let Some(c) = self.clients.get_mut(&host) {
            c.hosting = None;
        }
        self.waiting.retain(|id| *id != client);
        self.pair(host, client);
    }

    fn leave(&mut self, client: PeerId) {
        self.waiting.retain(|id| *id != client);

        let Some(c) = self.clients.get_mut(&client) else {
            return;
        };
        let partner = c.partner.take();
        let hosting = c.hosting.take();

        if let Some(code) = hosting {
            self.rooms.remove(&code);
            self.retired.insert(code);
        }
        if let Some(partner) = partner {
            if let Some(p) = self.clients.get_mut(&partner) {
                p.partner = None;
            }
            self.send(partner, &RelayEvent::PeerLeft);
        }
    }
}
