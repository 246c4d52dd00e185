use crate::application::matchmaking::{MatchmakingClient, PeerHandle};
use crate::application::runtime::Outbox;
use crate::application::SessionConfig;
use crate::domain::{Payload, RelayCommand, RelayEvent};
use crate::infrastructure::error::{MatchError, NetError, RoomError, TransportError};
use crate::infrastructure::transport::TransportFactory;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::pending;
use tandem_session_core::domain::{minutes_seconds, normalize_name};
use tandem_session_core::{
    Identity, Messages, OutputLine, OutputSink, PeerInfo, RoomCode, RoomCodeIssuer, Session,
    SessionCommand, SessionError, SessionId, SessionState,
};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// What an in-flight request resolved to
enum Resolution {
    Matched(Result<PeerHandle, MatchError>),
    Room(Result<PeerHandle, RoomError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RequestKind {
    Random,
    Host,
    Join(RoomCode),
}

/// The single matchmaking or room request in flight
///
/// The future owns its transport, so dropping the attempt cancels the
/// request and abandons the connection.
struct Attempt {
    id: u64,
    kind: RequestKind,
    future: BoxFuture<'static, Resolution>,
}

enum Wakeup {
    Resolved { attempt: u64, resolution: Resolution },
    Inbound(Option<RelayEvent>),
    ClosingDone,
    Heartbeat,
}

/// State machine coordinating identity, matchmaking and the partner link
///
/// UI operations (`set_name`, `request_*`, `send_message`, `close`,
/// `reset`) are synchronous: they update local state and emit their lines
/// before returning. Network work they start is driven by [`SessionCore::step`]
/// or [`SessionCore::run`], which resume it on the caller's task.
pub struct SessionCore {
    config: SessionConfig,
    matchmaking: MatchmakingClient,
    messages: Messages,
    identity: Identity,
    session: Session,
    issuer: RoomCodeIssuer,
    factory: Box<dyn TransportFactory>,
    sink: Box<dyn OutputSink>,
    attempts: u64,
    pending: Option<Attempt>,
    peer: Option<PeerHandle>,
    outbox: Outbox,
    closing: Option<BoxFuture<'static, ()>>,
    heartbeat: Option<Interval>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionCore {
    pub fn new(
        config: SessionConfig,
        factory: impl TransportFactory + 'static,
        sink: impl OutputSink + 'static,
    ) -> Self {
        let session = Session::new();
        let (state_tx, _) = watch::channel(session.state());

        tracing::info!(session = %session.id(), relay = %config.relay_url, "session core created");

        Self {
            matchmaking: MatchmakingClient::new(&config),
            messages: Messages::new(config.language),
            identity: Identity::new(config.default_name.as_deref()),
            outbox: Outbox::new(config.event_queue_size),
            config,
            session,
            issuer: RoomCodeIssuer::new(),
            factory: Box::new(factory),
            sink: Box::new(sink),
            attempts: 0,
            pending: None,
            peer: None,
            closing: None,
            heartbeat: None,
            state_tx,
        }
    }

    // ===== Getters =====

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session_id(&self) -> SessionId {
        self.session.id()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn room_code(&self) -> Option<&RoomCode> {
        self.session.room_code()
    }

    pub fn peer(&self) -> Option<&PeerInfo> {
        self.session.peer()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Watch state changes from another task
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    // ===== UI operations =====

    /// Rename the local user
    ///
    /// Blank input keeps the previous name without any output. Returns
    /// whether the name changed.
    pub fn set_name(&mut self, raw: &str) -> bool {
        if !matches!(self.identity.rename(raw), Ok(true)) {
            return false;
        }

        let name = self.identity.display_name().to_string();
        self.emit(OutputLine::status(self.messages.renamed(&name)));

        if self.state() == SessionState::Connected {
            self.queue(Payload::Name(name));
        }
        true
    }

    /// Pair with any waiting stranger
    pub fn request_random_match(&mut self) -> Result<(), SessionError> {
        self.prepare_request(RequestKind::Random, "find a partner")?;
        self.transition(Session::start_matchmaking)?;
        self.emit(OutputLine::status(self.messages.finding()));

        let transport = self.factory.create();
        let client = self.matchmaking.clone();
        self.launch(
            RequestKind::Random,
            async move { Resolution::Matched(client.find_random(transport).await) }.boxed(),
        );
        Ok(())
    }

    /// Host a new room (`None` or blank) or join the room under `code`
    pub fn request_room(&mut self, code: Option<&str>) -> Result<(), SessionError> {
        match code.map(str::trim).filter(|raw| !raw.is_empty()) {
            None => self.host_room(),
            Some(raw) => match RoomCode::parse(raw) {
                Ok(code) => self.join_room(code),
                Err(e) => {
                    self.emit(OutputLine::error(self.messages.invalid_code(raw)));
                    Err(e.into())
                }
            },
        }
    }

    /// Show the current room code again, or a notice when there is none
    pub fn request_share(&mut self) {
        let line = match self.session.room_code() {
            Some(code) => {
                let clip = self.share_text(code);
                OutputLine::share(clip.clone(), clip)
            }
            None => OutputLine::notice(self.messages.no_room()),
        };
        self.emit(line);
    }

    /// Queue a chat message for the partner
    ///
    /// Blank text is ignored. Outside `Connected` this fails with
    /// [`TransportError::NotConnected`] and emits an error line.
    pub fn send_message(&mut self, text: &str) -> Result<(), NetError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        if self.state() != SessionState::Connected || self.peer.is_none() {
            self.emit(OutputLine::error(self.messages.not_connected()));
            return Err(TransportError::NotConnected.into());
        }

        if let Err(e) = self.outbox.push(Payload::Text(text.to_string())) {
            self.emit(OutputLine::error(e.to_string()));
            return Err(e.into());
        }
        self.emit(OutputLine::local(text));
        Ok(())
    }

    /// Leave the current session
    ///
    /// A connected session passes through `Closing` until the partner link
    /// is torn down by the event loop; every other state closes at once.
    pub fn close(&mut self) -> Result<(), SessionError> {
        match self.state() {
            state @ (SessionState::Closing | SessionState::Closed) => {
                self.emit(OutputLine::notice(self.messages.already_closed()));
                Err(SessionError::ProtocolMisuse {
                    operation: "close",
                    state,
                })
            }
            SessionState::Idle => {
                self.transition(|s| s.transition(SessionState::Closed))?;
                self.emit(OutputLine::status(self.messages.closed()));
                Ok(())
            }
            SessionState::Matchmaking | SessionState::RoomWaiting => {
                self.cancel_pending();
                self.transition(Session::begin_closing)?;
                self.finish_close();
                Ok(())
            }
            SessionState::Connected => {
                self.begin_teardown();
                Ok(())
            }
        }
    }

    /// Start a fresh session after `Closed`
    pub fn reset(&mut self) -> Result<(), SessionError> {
        match self.state() {
            SessionState::Idle | SessionState::Closed => {
                self.start_new_session();
                self.emit(OutputLine::status(self.messages.ready()));
                Ok(())
            }
            state => {
                self.emit(OutputLine::notice(self.messages.busy()));
                Err(SessionError::ProtocolMisuse {
                    operation: "reset",
                    state,
                })
            }
        }
    }

    /// Apply one queued UI event
    pub fn apply(&mut self, command: SessionCommand) {
        tracing::debug!(?command, "applying command");

        let result: Result<(), NetError> = match command {
            SessionCommand::Rename { name } => {
                self.set_name(&name);
                Ok(())
            }
            SessionCommand::ClickRandom => self.request_random_match().map_err(Into::into),
            SessionCommand::ClickRoom { code } => {
                self.request_room(code.as_deref()).map_err(Into::into)
            }
            SessionCommand::ClickShare => {
                self.request_share();
                Ok(())
            }
            SessionCommand::Send { text } => self.send_message(&text),
            SessionCommand::Close => self.close().map_err(Into::into),
            SessionCommand::Reset => self.reset().map_err(Into::into),
        };

        if let Err(e) = result {
            tracing::debug!(error = %e, "command not applied");
        }
    }

    // ===== Event loop =====

    /// Flush queued payloads, then wait for and handle one network event
    ///
    /// Returns `false` without waiting when nothing is in flight.
    pub async fn step(&mut self) -> bool {
        self.flush().await;
        if !self.has_work() {
            return false;
        }

        let wakeup = self.next_wakeup().await;
        self.handle_wakeup(wakeup).await;
        true
    }

    /// Process UI commands and network events until the command channel closes
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        tracing::info!("session loop started");

        loop {
            self.flush().await;

            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => break,
                },
                wakeup = self.next_wakeup() => self.handle_wakeup(wakeup).await,
            }
        }

        self.shutdown().await;
        tracing::info!("session loop stopped");
    }

    /// Close whatever is open and wait for the teardown to finish
    pub async fn shutdown(&mut self) {
        if !matches!(self.state(), SessionState::Closing | SessionState::Closed) {
            let _ = self.close();
        }
        if let Some(closing) = self.closing.take() {
            closing.await;
            self.finish_close();
        }
    }

    fn has_work(&self) -> bool {
        self.pending.is_some() || self.peer.is_some() || self.closing.is_some()
    }

    async fn next_wakeup(&mut self) -> Wakeup {
        let Self {
            pending,
            peer,
            closing,
            heartbeat,
            ..
        } = self;

        tokio::select! {
            (attempt, resolution) = resolve(pending) => Wakeup::Resolved { attempt, resolution },
            event = inbound(peer) => Wakeup::Inbound(event),
            () = finish(closing) => Wakeup::ClosingDone,
            () = tick(heartbeat) => Wakeup::Heartbeat,
        }
    }

    async fn handle_wakeup(&mut self, wakeup: Wakeup) {
        match wakeup {
            Wakeup::Resolved {
                attempt,
                resolution,
            } => self.on_resolved(attempt, resolution),
            Wakeup::Inbound(Some(event)) => self.on_relay_event(event),
            Wakeup::Inbound(None) => {
                tracing::warn!("partner connection dropped");
                self.fail_transport(None);
            }
            Wakeup::ClosingDone => {
                self.closing = None;
                self.finish_close();
            }
            Wakeup::Heartbeat => {
                if let Some(peer) = self.peer.as_mut() {
                    let result = peer.send_command(&RelayCommand::HeartBeat).await;
                    if let Err(e) = result {
                        self.fail_transport(Some(e));
                    }
                }
            }
        }
    }

    /// Write queued payloads to the partner without waiting for anything else
    pub async fn flush(&mut self) {
        while let Some(payload) = self.outbox.pop() {
            let Some(peer) = self.peer.as_mut() else {
                self.outbox.clear();
                return;
            };

            let result = peer.send_payload(payload).await;
            if let Err(e) = result {
                tracing::warn!(error = %e, "failed to deliver payload");
                self.fail_transport(Some(e));
                return;
            }
        }
    }

    // ===== Resolution handling =====

    fn on_resolved(&mut self, attempt: u64, resolution: Resolution) {
        if self.pending.as_ref().is_some_and(|a| a.id == attempt) {
            self.pending = None;
        }
        if attempt != self.attempts || !self.state().is_pending() {
            // Dropping the resolution drops any partner link it carries
            tracing::debug!(attempt, current = self.attempts, "discarding stale resolution");
            return;
        }

        match resolution {
            Resolution::Matched(Ok(peer)) | Resolution::Room(Ok(peer)) => self.on_connected(peer),
            Resolution::Matched(Err(e)) => {
                tracing::warn!(error = %e, "random match failed");
                let text = match &e {
                    MatchError::NoPeer { .. } => self.messages.no_partner(),
                    MatchError::Transport(t) => self.messages.transport_failed(&t.to_string()),
                };
                self.fail_request(text);
            }
            Resolution::Room(Err(e)) => {
                tracing::warn!(error = %e, "room request failed");
                let text = match &e {
                    RoomError::Taken { code } => self.messages.room_taken(code.as_str()),
                    RoomError::NotFound { code } => self.messages.room_not_found(code.as_str()),
                    RoomError::Expired { code } => self.messages.room_expired(code.as_str()),
                    RoomError::Transport(t) => self.messages.transport_failed(&t.to_string()),
                };
                self.fail_request(text);
            }
        }
    }

    fn on_connected(&mut self, peer: PeerHandle) {
        let info = PeerInfo::new(peer.id(), peer.is_primary());
        if let Err(e) = self.transition(|s| s.connect(info)) {
            tracing::error!(error = %e, "cannot bind partner");
            return;
        }

        tracing::info!(peer = %peer.id(), is_primary = peer.is_primary(), "connected to partner");
        self.peer = Some(peer);
        self.heartbeat = Some(self.new_heartbeat());
        self.emit(OutputLine::status(self.messages.connected()));

        let name = self.identity.display_name().to_string();
        self.queue(Payload::Name(name));
    }

    fn on_relay_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Push {
                payload: Payload::Text(text),
            } => {
                let from = self
                    .session
                    .peer()
                    .map(|p| p.display_name().to_string())
                    .unwrap_or_default();
                self.emit(OutputLine::remote(from, text));
            }
            RelayEvent::Push {
                payload: Payload::Name(raw),
            } => {
                let Ok(name) = normalize_name(&raw) else {
                    tracing::debug!("ignoring blank partner name");
                    return;
                };
                let Some(info) = self.session.peer_mut() else {
                    return;
                };

                let line = match info.announce_name(name.clone()) {
                    None => Some(self.messages.peer_named(&name)),
                    Some(old) if old != name => Some(self.messages.peer_renamed(&old, &name)),
                    Some(_) => None,
                };
                if let Some(text) = line {
                    self.emit(OutputLine::notice(text));
                }
            }
            RelayEvent::PeerLeft => {
                tracing::info!("partner left");
                self.emit(OutputLine::notice(self.messages.partner_left()));
                self.begin_teardown();
            }
            other => tracing::debug!(event = ?other, "ignoring relay event"),
        }
    }

    // ===== Helpers =====

    fn emit(&mut self, line: OutputLine) {
        tracing::debug!(%line, "output");
        self.sink.output(line);
    }

    fn publish(&self) {
        let state = self.session.state();
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    fn transition(
        &mut self,
        change: impl FnOnce(&mut Session) -> Result<(), SessionError>,
    ) -> Result<(), SessionError> {
        let result = change(&mut self.session);
        if let Err(e) = &result {
            tracing::error!(error = %e, "rejected session transition");
        }
        self.publish();
        result
    }

    /// Make room for a new request, or refuse it with a busy line
    fn prepare_request(
        &mut self,
        kind: RequestKind,
        operation: &'static str,
    ) -> Result<(), SessionError> {
        match self.state() {
            SessionState::Idle => Ok(()),
            SessionState::Closed => {
                self.start_new_session();
                Ok(())
            }
            SessionState::Matchmaking | SessionState::RoomWaiting
                if self.pending.as_ref().is_some_and(|a| a.kind != kind) =>
            {
                self.cancel_pending();
                self.transition(Session::fail)?;
                self.emit(OutputLine::notice(self.messages.cancelled()));
                Ok(())
            }
            state => {
                self.emit(OutputLine::notice(self.messages.busy()));
                Err(SessionError::ProtocolMisuse { operation, state })
            }
        }
    }

    fn host_room(&mut self) -> Result<(), SessionError> {
        self.prepare_request(RequestKind::Host, "open a room")?;

        let code = self.issuer.issue();
        self.transition(|s| s.start_room(code.clone()))?;
        let clip = self.share_text(&code);
        self.emit(OutputLine::share(clip, self.messages.room_created(code.as_str())));

        let mut transport = self.factory.create();
        let client = self.matchmaking.clone();
        self.launch(
            RequestKind::Host,
            async move {
                let hosted = match client.host_room(transport.as_mut(), &code).await {
                    Ok(()) => client.await_guest(transport, &code).await,
                    Err(e) => Err(e),
                };
                Resolution::Room(hosted)
            }
            .boxed(),
        );
        Ok(())
    }

    fn join_room(&mut self, code: RoomCode) -> Result<(), SessionError> {
        self.prepare_request(RequestKind::Join(code.clone()), "join a room")?;

        self.issuer.remember(&code);
        self.transition(|s| s.start_room(code.clone()))?;
        self.emit(OutputLine::status(self.messages.joining_room(code.as_str())));

        let transport = self.factory.create();
        let client = self.matchmaking.clone();
        self.launch(
            RequestKind::Join(code.clone()),
            async move { Resolution::Room(client.join_room(transport, &code).await) }.boxed(),
        );
        Ok(())
    }

    fn launch(&mut self, kind: RequestKind, future: BoxFuture<'static, Resolution>) {
        self.attempts += 1;
        tracing::debug!(attempt = self.attempts, ?kind, "request launched");
        self.pending = Some(Attempt {
            id: self.attempts,
            kind,
            future,
        });
    }

    fn cancel_pending(&mut self) {
        if let Some(attempt) = self.pending.take() {
            tracing::info!(attempt = attempt.id, kind = ?attempt.kind, "request cancelled");
        }
    }

    fn fail_request(&mut self, text: String) {
        if self.transition(Session::fail).is_ok() {
            self.emit(OutputLine::error(text));
        }
    }

    fn queue(&mut self, payload: Payload) {
        if let Err(e) = self.outbox.push(payload) {
            tracing::warn!(error = %e, "outbox full");
            self.emit(OutputLine::error(e.to_string()));
        }
    }

    fn share_text(&self, code: &RoomCode) -> String {
        match &self.config.share_base_url {
            Some(base) => format!("{} {}?key={}", self.messages.invite(), base, code),
            None => code.to_string(),
        }
    }

    fn new_heartbeat(&self) -> Interval {
        let period = self
            .config
            .heartbeat_interval
            .max(std::time::Duration::from_millis(1));
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    fn emit_summary(&mut self) {
        let Some(info) = self.session.peer() else {
            return;
        };
        let (minute, second) = minutes_seconds(info.connected_at().elapsed());
        let text = self.messages.summary(info.display_name(), minute, second);
        self.emit(OutputLine::status(text));
    }

    /// Connected to Closing; the partner link closes in the background
    ///
    /// The teardown is bounded by `close_timeout`, so `Closed` is always
    /// reached even when the transport stalls.
    fn begin_teardown(&mut self) {
        self.emit_summary();
        if self.transition(Session::begin_closing).is_err() {
            return;
        }
        self.heartbeat = None;

        let queued = self.outbox.drain();
        let limit = self.config.close_timeout;
        match self.peer.take() {
            Some(mut peer) => {
                let teardown = async move {
                    for payload in queued {
                        if peer.send_payload(payload).await.is_err() {
                            break;
                        }
                    }
                    peer.close().await;
                };
                self.closing = Some(
                    async move {
                        if tokio::time::timeout(limit, teardown).await.is_err() {
                            tracing::warn!(?limit, "partner link did not close in time, abandoning it");
                        }
                    }
                    .boxed(),
                );
            }
            None => self.finish_close(),
        }
    }

    /// The partner link failed: straight through Closing to Closed
    fn fail_transport(&mut self, error: Option<TransportError>) {
        let text = match error {
            Some(e) => self.messages.transport_failed(&e.to_string()),
            None => self.messages.connection_lost(),
        };
        self.emit(OutputLine::error(text));

        self.emit_summary();
        self.peer = None;
        self.heartbeat = None;
        self.outbox.clear();
        if self.transition(Session::begin_closing).is_ok() {
            self.finish_close();
        }
    }

    fn finish_close(&mut self) {
        self.outbox.clear();
        if self.transition(Session::finish_closing).is_ok() {
            self.emit(OutputLine::status(self.messages.closed()));
        }
    }

    fn start_new_session(&mut self) {
        self.cancel_pending();
        self.peer = None;
        self.closing = None;
        self.heartbeat = None;
        self.outbox.clear();
        self.session = Session::new();
        tracing::info!(session = %self.session.id(), "new session");
        self.publish();
    }
}

async fn resolve(slot: &mut Option<Attempt>) -> (u64, Resolution) {
    match slot {
        Some(attempt) => {
            let resolution = (&mut attempt.future).await;
            (attempt.id, resolution)
        }
        None => pending().await,
    }
}

async fn inbound(peer: &mut Option<PeerHandle>) -> Option<RelayEvent> {
    match peer {
        Some(peer) => peer.recv().await,
        None => pending().await,
    }
}

async fn finish(closing: &mut Option<BoxFuture<'static, ()>>) {
    match closing {
        Some(closing) => closing.await,
        None => pending().await,
    }
}

async fn tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}
