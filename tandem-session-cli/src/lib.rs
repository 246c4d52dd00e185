pub mod infrastructure;
pub mod presentation;

pub use infrastructure::{CliError, LogConfig, RelayServer, Result};
pub use presentation::{forward_lines, spawn_stdin_reader, ConsoleSink, OutputFormat};
