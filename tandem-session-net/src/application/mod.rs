mod config;
mod matchmaking;
pub mod runtime;
mod session_core;

pub use config::{SessionConfig, DEFAULT_RELAY_URL};
pub use matchmaking::{MatchmakingClient, PeerHandle};
pub use runtime::{bootstrap, Outbox, QueueError, SessionHandle};
pub use session_core::SessionCore;
