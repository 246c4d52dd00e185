pub mod error;
pub mod memory;
pub mod relay_hub;
pub mod transport;
pub mod websocket;

pub use error::{MatchError, NetError, Result, RoomError, TransportError};
pub use memory::MemoryTransport;
pub use relay_hub::{ClientSender, RelayHub, DEFAULT_RETIRED_LIMIT};
pub use transport::{Transport, TransportFactory};
pub use websocket::WebSocketTransport;
