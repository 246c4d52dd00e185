use crate::application::runtime::QueueError;
use std::time::Duration;
use tandem_session_core::{RoomCode, SessionError};

/// Failures of the byte channel to the relay
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Connection closed")]
    Closed,

    #[error("Malformed frame: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Malformed(err.to_string())
    }
}

/// Random matchmaking failures
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("No partner found within {waited:?}")]
    NoPeer { waited: Duration },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Room hosting and joining failures
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("Room {code} is already taken")]
    Taken { code: RoomCode },

    #[error("Room {code} was not found")]
    NotFound { code: RoomCode },

    #[error("Room {code} has expired")]
    Expired { code: RoomCode },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Crate-level error
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Session loop has stopped")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, NetError>;
