use crate::infrastructure::error::Result;
use std::io::BufRead;
use tandem_session_core::SessionCommand;
use tandem_session_net::SessionHandle;
use tokio::sync::mpsc;

pub const HELP: &str = "\
Commands:
  /random           chat with whoever is waiting
  /room             open a room and get a code to share
  /room <code>      join a friend's room
  /share            show the room code again
  /name <name>      change your name
  /close            leave the current chat
  /reset            start over after a chat ended
  /quit             leave and exit
Anything else is sent to your partner.";

/// Read stdin on a dedicated thread
///
/// Blocking reads stay off the runtime so shutdown never waits for a
/// keypress. The channel closes at end of input.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read stdin");
                    break;
                }
            }
        }
    });

    rx
}

/// Feed typed lines to the session until `/quit`, `/exit` or end of input
///
/// The session is closed on the way out.
pub async fn forward_lines(
    mut lines: mpsc::UnboundedReceiver<String>,
    handle: &SessionHandle,
) -> Result<()> {
    while let Some(line) = lines.recv().await {
        match line.trim() {
            "/help" | "/?" => {
                println!("{HELP}");
                continue;
            }
            "/quit" | "/exit" => break,
            _ => {}
        }

        if let Some(command) = SessionCommand::parse_line(&line) {
            tracing::debug!(?command, "user input");
            handle.submit(command)?;
        }
    }

    handle.close()?;
    Ok(())
}
