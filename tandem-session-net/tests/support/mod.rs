#![allow(dead_code)]

pub mod raw_peer;

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tandem_session_core::{LineKind, OutputLine, SessionState};
use tandem_session_net::{
    MemoryTransport, RelayHub, SessionConfig, SessionCore, Transport, TransportError,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use raw_peer::RawPeer;

pub fn init_test_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

/// Output sink that keeps every line for later inspection
#[derive(Clone, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<OutputLine>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> impl FnMut(OutputLine) + Send + 'static {
        let lines = self.lines.clone();
        move |line: OutputLine| lines.lock().unwrap().push(line)
    }

    pub fn lines(&self) -> Vec<OutputLine> {
        self.lines.lock().unwrap().clone()
    }

    /// Remove and return everything recorded so far
    pub fn take(&self) -> Vec<OutputLine> {
        std::mem::take(&mut *self.lines.lock().unwrap())
    }

    pub fn texts(&self) -> Vec<String> {
        self.lines().iter().map(|l| l.text().to_string()).collect()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.lines().iter().any(|l| l.text() == text)
    }

    pub fn remote_texts(&self) -> Vec<(String, String)> {
        self.lines()
            .into_iter()
            .filter_map(|l| match l.kind() {
                LineKind::Remote { from } => Some((from.clone(), l.text().to_string())),
                _ => None,
            })
            .collect()
    }

    pub fn last_clip(&self) -> Option<String> {
        self.lines()
            .iter()
            .rev()
            .find_map(|l| l.clip().map(str::to_string))
    }

    /// Poll until a line with `text` shows up (for sessions on another task)
    pub async fn wait_for_text(&self, text: &str) {
        for _ in 0..200 {
            if self.contains(text) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no output line {text:?}; got {:?}", self.texts());
    }

    pub async fn wait_for_clip(&self) -> String {
        for _ in 0..200 {
            if let Some(clip) = self.last_clip() {
                return clip;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no share line; got {:?}", self.texts());
    }
}

pub fn test_config() -> SessionConfig {
    SessionConfig::new("memory://relay").with_default_name("Alice")
}

pub fn memory_factory(hub: &RelayHub) -> impl FnMut() -> MemoryTransport + Send + 'static {
    let hub = hub.clone();
    move || MemoryTransport::new(hub.clone())
}

/// Memory transport whose `close` never completes, like a dead TCP peer
pub struct StallingTransport {
    inner: MemoryTransport,
}

impl StallingTransport {
    pub fn new(hub: RelayHub) -> Self {
        Self {
            inner: MemoryTransport::new(hub),
        }
    }
}

#[async_trait]
impl Transport for StallingTransport {
    async fn connect(&mut self, endpoint: &str) -> Result<(), TransportError> {
        self.inner.connect(endpoint).await
    }

    async fn send(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        self.inner.send(bytes).await
    }

    async fn recv(&mut self) -> Option<Vec<u8>> {
        self.inner.recv().await
    }

    async fn close(&mut self) {
        std::future::pending::<()>().await
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }
}

pub fn new_core(hub: &RelayHub, config: SessionConfig) -> (SessionCore, RecordingSink) {
    let sink = RecordingSink::new();
    let core = SessionCore::new(config, memory_factory(hub), sink.sink());
    (core, sink)
}

/// Drive the core for a short while, leaving anything unresolved in flight
pub async fn poll_briefly(core: &mut SessionCore) {
    let _ = tokio::time::timeout(Duration::from_millis(10), core.step()).await;
}

/// Step the core until it reaches `target`
pub async fn step_until(core: &mut SessionCore, target: SessionState) {
    for _ in 0..20 {
        if core.state() == target {
            return;
        }
        if !core.step().await {
            break;
        }
    }
    assert_eq!(core.state(), target);
}

/// A core paired with a hand-driven partner through random matching
///
/// The partner's `Joined` and our name announcement are already consumed.
pub async fn connected_pair(hub: &RelayHub) -> (SessionCore, RecordingSink, RawPeer) {
    let mut partner = RawPeer::connect(hub).await;
    partner.join_random().await;

    let (mut core, sink) = new_core(hub, test_config());
    core.request_random_match().unwrap();
    step_until(&mut core, SessionState::Connected).await;

    partner.expect_joined().await;
    core.flush().await;
    partner.expect_name("Alice").await;

    (core, sink, partner)
}
