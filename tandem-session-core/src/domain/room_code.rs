use crate::domain::InputError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// Characters used for generated codes (no 0/O or 1/I lookalikes)
const ALPHABET: &[u8; 32] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Length of a generated code
pub const GENERATED_LEN: usize = 6;

const MIN_LEN: usize = 4;
const MAX_LEN: usize = 12;

/// Shareable token identifying a rendezvous point
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Generate a fresh random code
    pub fn generate() -> Self {
        let bytes = Uuid::new_v4().into_bytes();
        let code = bytes
            .iter()
            .take(GENERATED_LEN)
            .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
            .collect();
        Self(code)
    }

    /// Parse a user-supplied code (trimmed, case-insensitive)
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let code = raw.trim().to_ascii_uppercase();

        if !(MIN_LEN..=MAX_LEN).contains(&code.len())
            || !code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(InputError::InvalidRoomCode);
        }

        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

/// Remembers every code handed out so none is issued twice
#[derive(Debug, Default)]
pub struct RoomCodeIssuer {
    issued: HashSet<RoomCode>,
}

impl RoomCodeIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a code that has never been issued before
    pub fn issue(&mut self) -> RoomCode {
        loop {
            let code = RoomCode::generate();
            if self.issued.insert(code.clone()) {
                return code;
            }
            tracing::debug!(%code, "generated room code already issued, retrying");
        }
    }

    /// Record a code that was obtained elsewhere (e.g. joined by the user)
    pub fn remember(&mut self, code: &RoomCode) {
        self.issued.insert(code.clone());
    }

    pub fn was_issued(&self, code: &RoomCode) -> bool {
        self.issued.contains(code)
    }

    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_shape() {
        let code = RoomCode::generate();

        assert_eq!(code.as_str().len(), GENERATED_LEN);
        assert!(code.as_str().bytes().all(|b| ALPHABET.contains(&b)));
    }

    #[test]
    fn test_generated_code_parses() {
        let code = RoomCode::generate();
        assert_eq!(RoomCode::parse(code.as_str()), Ok(code));
    }

    #[test]
    fn test_parse_normalizes() {
        let code = RoomCode::parse("  abc123 ").unwrap();
        assert_eq!(code.as_str(), "ABC123");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        for raw in ["", "   ", "AB1", "ABCDEFGHIJKLM", "AB-123", "ÄBC123"] {
            assert_eq!(
                RoomCode::parse(raw),
                Err(InputError::InvalidRoomCode),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_issuer_never_repeats() {
        let mut issuer = RoomCodeIssuer::new();
        let mut seen = HashSet::new();

        for _ in 0..500 {
            assert!(seen.insert(issuer.issue()));
        }
        assert_eq!(issuer.issued_count(), 500);
    }

    #[test]
    fn test_issuer_remember() {
        let mut issuer = RoomCodeIssuer::new();
        let code = RoomCode::parse("ABC123").unwrap();

        assert!(!issuer.was_issued(&code));
        issuer.remember(&code);
        assert!(issuer.was_issued(&code));
    }

    #[test]
    fn test_serialization() {
        let code = RoomCode::parse("abc123").unwrap();

        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"ABC123\"");

        let deserialized: RoomCode = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, code);

        assert!(serde_json::from_str::<RoomCode>("\"x\"").is_err());
    }
}
