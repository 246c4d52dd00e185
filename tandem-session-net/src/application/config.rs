use std::time::Duration;
use tandem_session_core::Language;

pub const DEFAULT_RELAY_URL: &str = "ws://127.0.0.1:9077";

/// Configuration for a chat session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Relay endpoint handed to every new transport
    pub relay_url: String,

    /// How long random matching and room requests wait for the relay
    pub match_timeout: Duration,

    /// How long a hosted room stays open without a guest
    pub room_ttl: Duration,

    /// Keep-alive period while a transport is open
    pub heartbeat_interval: Duration,

    /// Upper bound on the `Closing` teardown; the link is abandoned after it
    pub close_timeout: Duration,

    pub language: Language,

    /// Base URL for invite links (`{base}?key={code}`); bare codes when unset
    pub share_base_url: Option<String>,

    /// Display name to start with; a `guest-XXXX` name when unset
    pub default_name: Option<String>,

    /// Room code to join right after bootstrap
    pub auto_join: Option<String>,

    /// Max payloads queued for the partner before sends are refused
    pub event_queue_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            match_timeout: Duration::from_secs(30),
            room_ttl: Duration::from_secs(10 * 60),
            heartbeat_interval: Duration::from_secs(15),
            close_timeout: Duration::from_secs(5),
            language: Language::default(),
            share_base_url: None,
            default_name: None,
            auto_join: None,
            event_queue_size: 100,
        }
    }
}

impl SessionConfig {
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
            ..Default::default()
        }
    }

    /// Defaults overridden by `TANDEM_RELAY_URL`, `TANDEM_LANGUAGE`,
    /// `TANDEM_SHARE_URL` and `TANDEM_NAME`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("TANDEM_RELAY_URL") {
            config.relay_url = url;
        }
        if let Some(tag) = lookup("TANDEM_LANGUAGE") {
            match Language::from_tag(&tag) {
                Some(language) => config.language = language,
                None => tracing::warn!(%tag, "unsupported language, keeping default"),
            }
        }
        if let Some(base) = lookup("TANDEM_SHARE_URL") {
            config.share_base_url = Some(base);
        }
        if let Some(name) = lookup("TANDEM_NAME") {
            config.default_name = Some(name);
        }
        config
    }

    pub fn with_match_timeout(mut self, timeout: Duration) -> Self {
        self.match_timeout = timeout;
        self
    }

    pub fn with_room_ttl(mut self, ttl: Duration) -> Self {
        self.room_ttl = ttl;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_share_base_url(mut self, base: impl Into<String>) -> Self {
        self.share_base_url = Some(base.into());
        self
    }

    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = Some(name.into());
        self
    }

    pub fn with_auto_join(mut self, code: impl Into<String>) -> Self {
        self.auto_join = Some(code.into());
        self
    }

    pub fn with_event_queue_size(mut self, size: usize) -> Self {
        self.event_queue_size = size;
        self
    }
}
