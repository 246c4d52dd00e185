pub mod identity;
pub mod messages;
pub mod output;
pub mod peer;
pub mod room_code;
pub mod session;
pub mod time;

pub use identity::{normalize_name, Identity, InputError, MAX_NAME_CHARS};
pub use messages::{Language, Messages};
pub use output::{LineKind, OutputLine, OutputSink};
pub use peer::{PeerId, PeerInfo};
pub use room_code::{RoomCode, RoomCodeIssuer};
pub use session::{Session, SessionError, SessionId, SessionState};
pub use time::{minutes_seconds, Timestamp};
