use crate::application::session_core::SessionCore;
use crate::application::SessionConfig;
use crate::infrastructure::error::{NetError, Result};
use crate::infrastructure::transport::TransportFactory;
use tandem_session_core::{OutputSink, SessionCommand, SessionState};
use tokio::sync::{mpsc, watch};
use tracing::Instrument;

/// Cloneable front door to a session running on its own task
///
/// Commands are queued in arrival order and applied one at a time, so two
/// clicks are never handled concurrently.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn submit(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| NetError::ChannelClosed)
    }

    pub fn rename(&self, name: impl Into<String>) -> Result<()> {
        self.submit(SessionCommand::Rename { name: name.into() })
    }

    pub fn click_random(&self) -> Result<()> {
        self.submit(SessionCommand::ClickRandom)
    }

    pub fn click_room(&self, code: Option<&str>) -> Result<()> {
        self.submit(SessionCommand::ClickRoom {
            code: code.map(str::to_string),
        })
    }

    pub fn click_share(&self) -> Result<()> {
        self.submit(SessionCommand::ClickShare)
    }

    pub fn send(&self, text: impl Into<String>) -> Result<()> {
        self.submit(SessionCommand::Send { text: text.into() })
    }

    pub fn close(&self) -> Result<()> {
        self.submit(SessionCommand::Close)
    }

    pub fn reset(&self) -> Result<()> {
        self.submit(SessionCommand::Reset)
    }

    // ===== Getters =====

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Wait until the session reaches `target`
    pub async fn wait_for_state(&self, target: SessionState) -> Result<()> {
        let mut state = self.state.clone();
        state
            .wait_for(|current| *current == target)
            .await
            .map(|_| ())
            .map_err(|_| NetError::ChannelClosed)
    }
}

/// Wire a session to its transports and output, then start its loop
///
/// Must be called from within a Tokio runtime. The loop closes the session
/// and stops once every handle has been dropped.
pub fn bootstrap(
    config: SessionConfig,
    factory: impl TransportFactory + 'static,
    sink: impl OutputSink + 'static,
) -> SessionHandle {
    let auto_join = config.auto_join.clone();
    let mut core = SessionCore::new(config, factory, sink);

    if let Some(code) = auto_join {
        tracing::info!(%code, "auto-joining room");
        core.apply(SessionCommand::ClickRoom { code: Some(code) });
    }

    let (commands, receiver) = mpsc::unbounded_channel();
    let state = core.subscribe();
    let span = tracing::info_span!("session", id = %core.session_id());

    tokio::spawn(core.run(receiver).instrument(span));

    SessionHandle { commands, state }
}
