//! Matchmaking, relay transports and the session event loop
//!
//! The domain model lives in `tandem-session-core`; this crate connects it
//! to a relay and drives it on a Tokio task.

// Domain layer (wire protocol)
pub mod domain;

// Application layer (matchmaking, session loop)
pub mod application;

// Infrastructure layer (transports, relay)
pub mod infrastructure;

// Re-exports for convenience
pub use application::{
    bootstrap, MatchmakingClient, PeerHandle, SessionConfig, SessionCore, SessionHandle,
};
pub use domain::{Payload, RelayCommand, RelayEvent};
pub use infrastructure::error::{MatchError, NetError, Result, RoomError, TransportError};
pub use infrastructure::{
    MemoryTransport, RelayHub, Transport, TransportFactory, WebSocketTransport,
    DEFAULT_RETIRED_LIMIT,
};
