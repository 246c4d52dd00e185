pub mod error;
pub mod observability;
pub mod relay_server;

pub use error::{CliError, Result};
pub use observability::LogConfig;
pub use relay_server::RelayServer;
