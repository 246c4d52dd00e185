use clap::Parser;
use std::net::SocketAddr;
use tandem_session_cli::{CliError, LogConfig, RelayServer, Result};
use tandem_session_net::{RelayHub, DEFAULT_RETIRED_LIMIT};
use tracing::info;

#[derive(Parser)]
#[command(name = "tandem-relay")]
#[command(version, about = "Tandem relay - pairs chat clients and forwards their messages")]
struct Cli {
    /// Address to listen on
    #[arg(short = 'a', long, env = "TANDEM_RELAY_ADDR", default_value = "127.0.0.1:9077")]
    address: SocketAddr,

    /// How many used or abandoned room codes to remember
    #[arg(long, env = "TANDEM_RETIRED_LIMIT", default_value_t = DEFAULT_RETIRED_LIMIT)]
    retired_limit: usize,

    /// Debug logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Log as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = if cli.verbose {
        LogConfig::dev()
    } else {
        LogConfig::default()
    };
    if cli.json_logs {
        logging = logging.with_json();
    }
    logging.init().map_err(CliError::Logging)?;

    let hub = RelayHub::with_retired_limit(cli.retired_limit);
    let server = RelayServer::bind(hub.clone(), cli.address).await?;
    info!(address = %server.local_addr(), "relay ready");

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!(clients = hub.client_count(), "Shutting down...");
            hub.disconnect_all();
        }
    }
    Ok(())
}
