mod commands;

pub use commands::SessionCommand;
