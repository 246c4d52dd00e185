//! Domain model of a two-party chat session
//!
//! Everything here is synchronous and runtime-agnostic. Networking, timers
//! and the event loop live in `tandem-session-net`.

pub mod application;
pub mod domain;

pub use application::SessionCommand;
pub use domain::{
    Identity, InputError, Language, LineKind, Messages, OutputLine, OutputSink, PeerId, PeerInfo,
    RoomCode, RoomCodeIssuer, Session, SessionError, SessionId, SessionState, Timestamp,
};
