//! Relay wire protocol
//!
//! Every frame is one JSON object tagged by `"type"`. Clients send
//! [`RelayCommand`]s and receive [`RelayEvent`]s. Chat content travels as a
//! [`Payload`] inside `Push`, which the relay forwards to the partner
//! untouched.

use crate::infrastructure::error::TransportError;
use serde::{Deserialize, Serialize};
use tandem_session_core::RoomCode;

/// Client to relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayCommand {
    HeartBeat,
    JoinRandom,
    CreateRoom { key: RoomCode },
    JoinRoom { key: RoomCode },
    Leave,
    Push { payload: Payload },
}

/// Relay to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayEvent {
    /// Paired with a partner. The side that was waiting is primary.
    Joined { is_primary: bool },
    RoomCreated { key: RoomCode },
    RoomTaken { key: RoomCode },
    NotFound,
    Expired,
    Push { payload: Payload },
    PeerLeft,
}

/// Content exchanged between partners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Name(String),
    Text(String),
}

impl RelayCommand {
    pub fn encode(&self) -> Result<Vec<u8>, TransportError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TransportError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl RelayEvent {
    pub fn encode(&self) -> Result<Vec<u8>, TransportError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TransportError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let key = RoomCode::parse("ABC123").unwrap();
        let json = String::from_utf8(RelayCommand::JoinRoom { key }.encode().unwrap()).unwrap();
        assert_eq!(json, r#"{"type":"JoinRoom","key":"ABC123"}"#);

        let json = String::from_utf8(RelayCommand::HeartBeat.encode().unwrap()).unwrap();
        assert_eq!(json, r#"{"type":"HeartBeat"}"#);
    }

    #[test]
    fn test_push_payload_wire_format() {
        let event = RelayEvent::Push {
            payload: Payload::Name("Alice".to_string()),
        };
        let json = String::from_utf8(event.encode().unwrap()).unwrap();
        assert_eq!(json, r#"{"type":"Push","payload":{"Name":"Alice"}}"#);

        assert_eq!(RelayEvent::decode(json.as_bytes()).unwrap(), event);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            RelayEvent::decode(b"not json"),
            Err(TransportError::Malformed(_))
        ));
        assert!(RelayCommand::decode(br#"{"type":"JoinRoom","key":"x"}"#).is_err());
    }
}
