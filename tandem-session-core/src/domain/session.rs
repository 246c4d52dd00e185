use crate::domain::{InputError, PeerInfo, RoomCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of one session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Matchmaking,
    RoomWaiting,
    Connected,
    Closing,
    Closed,
}

impl SessionState {
    pub const ALL: [SessionState; 6] = [
        SessionState::Idle,
        SessionState::Matchmaking,
        SessionState::RoomWaiting,
        SessionState::Connected,
        SessionState::Closing,
        SessionState::Closed,
    ];

    /// The transition table
    ///
    /// ```text
    /// Idle        -> Matchmaking | RoomWaiting | Closed
    /// Matchmaking -> Connected | Idle | Closing
    /// RoomWaiting -> Connected | Idle | Closing
    /// Connected   -> Closing
    /// Closing     -> Closed
    /// Closed      -> (terminal)
    /// ```
    ///
    /// Message exchange while `Connected` is not a transition.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, next),
            (Idle, Matchmaking)
                | (Idle, RoomWaiting)
                | (Idle, Closed)
                | (Matchmaking, Connected)
                | (Matchmaking, Idle)
                | (Matchmaking, Closing)
                | (RoomWaiting, Connected)
                | (RoomWaiting, Idle)
                | (RoomWaiting, Closing)
                | (Connected, Closing)
                | (Closing, Closed)
        )
    }

    /// A matchmaking or room request is in flight
    pub fn is_pending(self) -> bool {
        matches!(self, SessionState::Matchmaking | SessionState::RoomWaiting)
    }

    pub fn is_terminal(self) -> bool {
        self == SessionState::Closed
    }

    /// A room code may only exist in these states
    pub fn holds_room_code(self) -> bool {
        matches!(self, SessionState::RoomWaiting | SessionState::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Matchmaking => "matchmaking",
            SessionState::RoomWaiting => "waiting in room",
            SessionState::Connected => "connected",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Errors raised by session operations
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("Cannot {operation} while {state}")]
    ProtocolMisuse {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}

/// One chat lifecycle, from idle through connection to closure
///
/// The session only tracks state. Transports and in-flight requests are
/// owned by whoever drives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    room_code: Option<RoomCode>,
    peer: Option<PeerInfo>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            state: SessionState::Idle,
            room_code: None,
            peer: None,
        }
    }

    // ===== Getters =====

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn room_code(&self) -> Option<&RoomCode> {
        self.room_code.as_ref()
    }

    pub fn peer(&self) -> Option<&PeerInfo> {
        self.peer.as_ref()
    }

    pub fn peer_mut(&mut self) -> Option<&mut PeerInfo> {
        self.peer.as_mut()
    }

    // ===== Transitions =====

    /// Move to `next` if the transition table allows it
    ///
    /// Leaving the room-holding states drops the room code; returning to
    /// `Idle` or reaching `Closed` drops the peer.
    pub fn transition(&mut self, next: SessionState) -> Result<(), SessionError> {
        if !self.state.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        tracing::info!(session = %self.id, from = ?self.state, to = ?next, "session transition");
        self.state = next;

        if !next.holds_room_code() {
            self.room_code = None;
        }
        if matches!(next, SessionState::Idle | SessionState::Closed) {
            self.peer = None;
        }
        Ok(())
    }

    pub fn start_matchmaking(&mut self) -> Result<(), SessionError> {
        self.transition(SessionState::Matchmaking)
    }

    /// Enter `RoomWaiting` for a hosted or joined room
    pub fn start_room(&mut self, code: RoomCode) -> Result<(), SessionError> {
        self.transition(SessionState::RoomWaiting)?;
        self.room_code = Some(code);
        Ok(())
    }

    pub fn connect(&mut self, peer: PeerInfo) -> Result<(), SessionError> {
        self.transition(SessionState::Connected)?;
        self.peer = Some(peer);
        Ok(())
    }

    /// Failure edge back to `Idle`
    pub fn fail(&mut self) -> Result<(), SessionError> {
        self.transition(SessionState::Idle)
    }

    pub fn begin_closing(&mut self) -> Result<(), SessionError> {
        self.transition(SessionState::Closing)
    }

    pub fn finish_closing(&mut self) -> Result<(), SessionError> {
        self.transition(SessionState::Closed)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PeerId;

    fn code() -> RoomCode {
        RoomCode::parse("ABC123").unwrap()
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = Session::new();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.room_code().is_none());
        assert!(session.peer().is_none());
    }

    #[test]
    fn test_random_path() {
        let mut session = Session::new();

        session.start_matchmaking().unwrap();
        session.connect(PeerInfo::new(PeerId::new(), false)).unwrap();
        assert_eq!(session.state(), SessionState::Connected);
        assert!(session.peer().is_some());

        session.begin_closing().unwrap();
        assert!(session.peer().is_some());

        session.finish_closing().unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.peer().is_none());
    }

    #[test]
    fn test_room_path_keeps_code_until_closing() {
        let mut session = Session::new();

        session.start_room(code()).unwrap();
        assert_eq!(session.room_code(), Some(&code()));

        session.connect(PeerInfo::new(PeerId::new(), true)).unwrap();
        assert_eq!(session.room_code(), Some(&code()));

        session.begin_closing().unwrap();
        assert!(session.room_code().is_none());
    }

    #[test]
    fn test_failure_clears_room_code() {
        let mut session = Session::new();
        session.start_room(code()).unwrap();

        session.fail().unwrap();

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.room_code().is_none());
    }

    #[test]
    fn test_invalid_transition_leaves_state() {
        let mut session = Session::new();

        let result = session.connect(PeerInfo::new(PeerId::new(), false));

        assert_eq!(
            result,
            Err(SessionError::InvalidTransition {
                from: SessionState::Idle,
                to: SessionState::Connected,
            })
        );
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.peer().is_none());
    }

    #[test]
    fn test_closed_is_terminal() {
        for next in SessionState::ALL {
            assert!(!SessionState::Closed.can_transition_to(next));
        }
        assert!(SessionState::Closed.is_terminal());
    }

    #[test]
    fn test_connected_has_no_self_transition() {
        assert!(!SessionState::Connected.can_transition_to(SessionState::Connected));
    }

    /// Replays every path of up to six steps through the table and checks
    /// the session lands where the table says, rejecting illegal steps
    /// without moving.
    #[test]
    fn test_replay_conformance() {
        fn walk(session: &Session, depth: usize, visited: &mut usize) {
            *visited += 1;
            if depth == 0 {
                return;
            }

            for next in SessionState::ALL {
                let mut replayed = session.clone();
                let allowed = session.state().can_transition_to(next);
                let result = match next {
                    SessionState::RoomWaiting => replayed.start_room(code()),
                    SessionState::Connected => {
                        replayed.connect(PeerInfo::new(PeerId::new(), false))
                    }
                    other => replayed.transition(other),
                };

                if allowed {
                    assert!(result.is_ok());
                    assert_eq!(replayed.state(), next);
                    if !next.holds_room_code() {
                        assert!(replayed.room_code().is_none());
                    }
                    walk(&replayed, depth - 1, visited);
                } else {
                    assert!(result.is_err());
                    assert_eq!(replayed, *session);
                }
            }
        }

        let mut visited = 0;
        walk(&Session::new(), 6, &mut visited);
        assert!(visited > 20);
    }

    #[test]
    fn test_error_display() {
        let err = SessionError::ProtocolMisuse {
            operation: "find a partner",
            state: SessionState::Connected,
        };
        assert_eq!(err.to_string(), "Cannot find a partner while connected");

        let err: SessionError = InputError::EmptyName.into();
        assert_eq!(err.to_string(), "Name cannot be empty");
    }
}
