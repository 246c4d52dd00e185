use serde::{Deserialize, Serialize};

/// UI-originated events a session accepts
///
/// Hosts that cannot call the session directly (another task, another
/// process) send these instead. They are applied strictly in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionCommand {
    /// Change the local display name
    Rename { name: String },

    /// Pair with any waiting stranger
    ClickRandom,

    /// Host a new room (no code) or join an existing one
    ClickRoom { code: Option<String> },

    /// Show the current room code again
    ClickShare,

    /// Send a chat message to the partner
    Send { text: String },

    /// Leave the current session
    Close,

    /// Start over after a closed session
    Reset,
}

impl SessionCommand {
    /// Parse one line of host input
    ///
    /// `/name <n>`, `/random`, `/room [code]`, `/share`, `/quit` and `/reset`
    /// are commands; anything else is chat text. Blank lines yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Some(SessionCommand::Send {
                text: line.to_string(),
            });
        };

        let (verb, arg) = match rest.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (rest, ""),
        };

        let command = match verb {
            "name" | "nick" => SessionCommand::Rename {
                name: arg.to_string(),
            },
            "random" => SessionCommand::ClickRandom,
            "room" | "join" => SessionCommand::ClickRoom {
                code: (!arg.is_empty()).then(|| arg.to_string()),
            },
            "share" => SessionCommand::ClickShare,
            "quit" | "close" | "leave" => SessionCommand::Close,
            "reset" => SessionCommand::Reset,
            _ => SessionCommand::Send {
                text: line.to_string(),
            },
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            SessionCommand::parse_line("/name  Alice "),
            Some(SessionCommand::Rename {
                name: "Alice".to_string()
            })
        );
        assert_eq!(
            SessionCommand::parse_line("/random"),
            Some(SessionCommand::ClickRandom)
        );
        assert_eq!(
            SessionCommand::parse_line("/room"),
            Some(SessionCommand::ClickRoom { code: None })
        );
        assert_eq!(
            SessionCommand::parse_line("/room abc123"),
            Some(SessionCommand::ClickRoom {
                code: Some("abc123".to_string())
            })
        );
        assert_eq!(
            SessionCommand::parse_line("/share"),
            Some(SessionCommand::ClickShare)
        );
        assert_eq!(
            SessionCommand::parse_line("/quit"),
            Some(SessionCommand::Close)
        );
        assert_eq!(
            SessionCommand::parse_line("/reset"),
            Some(SessionCommand::Reset)
        );
    }

    #[test]
    fn test_parse_text() {
        assert_eq!(
            SessionCommand::parse_line("  hello there "),
            Some(SessionCommand::Send {
                text: "hello there".to_string()
            })
        );
        // Unknown commands are sent as text
        assert_eq!(
            SessionCommand::parse_line("/shrug"),
            Some(SessionCommand::Send {
                text: "/shrug".to_string()
            })
        );
        assert_eq!(SessionCommand::parse_line("   "), None);
    }

    #[test]
    fn test_serialization() {
        let cmd = SessionCommand::ClickRoom {
            code: Some("ABC123".to_string()),
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"type\":\"click_room\""));

        let back: SessionCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }
}
