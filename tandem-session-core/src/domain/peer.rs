use crate::domain::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier the relay assigns to a remote party
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(Uuid);

impl PeerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PeerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// What the session knows about its connected partner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    id: PeerId,
    /// Last name the partner announced (unknown until the first announcement)
    name: Option<String>,
    /// True when the local side was the one waiting for a partner
    is_primary: bool,
    connected_at: Timestamp,
}

impl PeerInfo {
    pub fn new(id: PeerId, is_primary: bool) -> Self {
        Self {
            id,
            name: None,
            is_primary,
            connected_at: Timestamp::now(),
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name for display, falling back to a neutral label
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("partner")
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn connected_at(&self) -> Timestamp {
        self.connected_at
    }

    /// Record a name announcement, returning the previous name
    pub fn announce_name(&mut self, name: String) -> Option<String> {
        self.name.replace(name)
    }
}
