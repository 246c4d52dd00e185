mod console;
mod repl;

pub use console::{ConsoleSink, OutputFormat};
pub use repl::{forward_lines, spawn_stdin_reader, HELP};
