mod handle;
mod outbox;

pub use handle::{bootstrap, SessionHandle};
pub use outbox::{Outbox, QueueError};
