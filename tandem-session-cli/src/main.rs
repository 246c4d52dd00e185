use clap::Parser;
use std::time::Duration;
use tandem_session_cli::{
    forward_lines, spawn_stdin_reader, CliError, ConsoleSink, LogConfig, OutputFormat, Result,
};
use tandem_session_core::{Language, SessionState};
use tandem_session_net::{
    application::DEFAULT_RELAY_URL, bootstrap, SessionConfig, WebSocketTransport,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "tandem-cli")]
#[command(version, about = "Tandem - chat with a stranger or a friend from the terminal")]
struct Cli {
    /// Relay WebSocket URL
    #[arg(short = 's', long, env = "TANDEM_RELAY_URL", default_value = DEFAULT_RELAY_URL)]
    relay: String,

    /// Display name (a guest-XXXX name when unset)
    #[arg(short = 'n', long, env = "TANDEM_NAME")]
    name: Option<String>,

    /// Interface language (en, ja); falls back to LANG
    #[arg(short = 'l', long, env = "TANDEM_LANGUAGE")]
    language: Option<String>,

    /// Base URL for invite links, e.g. https://chat.example
    #[arg(long, env = "TANDEM_SHARE_URL")]
    share_url: Option<String>,

    /// Join this room right away
    #[arg(short = 'j', long)]
    join: Option<String>,

    /// Start random matching right away
    #[arg(short = 'r', long, conflicts_with = "join")]
    random: bool,

    /// Seconds to wait for a random partner
    #[arg(long, default_value_t = 30)]
    match_timeout: u64,

    /// Seconds a hosted room stays open
    #[arg(long, default_value_t = 600)]
    room_ttl: u64,

    /// Print output lines as JSON
    #[arg(long)]
    json: bool,

    /// Copy room codes and invite links to the clipboard
    #[arg(long)]
    copy: bool,

    /// Debug logging on stderr
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Enable tokio console
    #[cfg(feature = "console")]
    #[arg(long)]
    console: bool,
}

impl Cli {
    fn log_config(&self) -> LogConfig {
        let config = if self.verbose {
            LogConfig::dev()
        } else {
            LogConfig::chat()
        };

        #[cfg(feature = "console")]
        let config = if self.console {
            config.with_console()
        } else {
            config
        };

        config
    }

    fn language(&self) -> Result<Language> {
        match &self.language {
            Some(tag) => Language::from_tag(tag)
                .ok_or_else(|| CliError::InvalidConfig(format!("unsupported language: {tag}"))),
            None => Ok(std::env::var("LANG")
                .ok()
                .and_then(|tag| Language::from_tag(&tag))
                .unwrap_or_default()),
        }
    }

    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = SessionConfig::new(self.relay.clone())
            .with_language(self.language()?)
            .with_match_timeout(Duration::from_secs(self.match_timeout))
            .with_room_ttl(Duration::from_secs(self.room_ttl));

        if let Some(name) = &self.name {
            config = config.with_default_name(name.clone());
        }
        if let Some(base) = &self.share_url {
            config = config.with_share_base_url(base.clone());
        }
        if let Some(code) = &self.join {
            config = config.with_auto_join(code.clone());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.log_config().init().map_err(CliError::Logging)?;

    let config = cli.session_config()?;
    info!(relay = %config.relay_url, "starting tandem");

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Plain
    };
    let sink = ConsoleSink::stdout(config.language)
        .with_format(format)
        .with_clipboard(cli.copy);

    let handle = bootstrap(config, WebSocketTransport::new, sink);
    if cli.random {
        handle.click_random()?;
    }
    if !cli.json {
        println!("Type /help for commands.");
    }

    let input = spawn_stdin_reader();
    tokio::select! {
        result = forward_lines(input, &handle) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
            handle.close()?;
        }
    }

    // Give the partner a chance to hear that we left
    let closed = handle.wait_for_state(SessionState::Closed);
    if tokio::time::timeout(Duration::from_secs(2), closed).await.is_err() {
        tracing::warn!("session did not close in time");
    }
    Ok(())
}
