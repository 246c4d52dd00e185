use instant::Instant;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

/// Timestamp in milliseconds since process start (monotonic)
///
/// Backed by `instant::Instant` so the same code runs in the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn now() -> Self {
        static ANCHOR: OnceLock<Instant> = OnceLock::new();
        let anchor = ANCHOR.get_or_init(Instant::now);

        Timestamp(Instant::now().duration_since(*anchor).as_millis() as u64)
    }

    pub fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Time elapsed between `earlier` and this timestamp (zero if reversed)
    pub fn since(&self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// Time elapsed from this timestamp until now
    pub fn elapsed(&self) -> Duration {
        Timestamp::now().since(*self)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Split a duration into whole minutes and remaining seconds
pub fn minutes_seconds(duration: Duration) -> (u64, u64) {
    let total = duration.as_secs();
    (total / 60, total % 60)
}
