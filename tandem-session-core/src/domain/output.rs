use serde::{Deserialize, Serialize};
use std::fmt;

/// What produced an output line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineKind {
    /// Lifecycle change of the local session
    Status,
    /// Informational line, including advisories for ignored requests
    Notice,
    /// Something failed
    Error,
    /// Room code or invite link; `clip` is what a host should copy
    Share { clip: String },
    /// Text typed by the local user
    Local,
    /// Text received from the partner
    Remote { from: String },
}

/// One immutable line of user-visible output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    kind: LineKind,
    text: String,
}

impl OutputLine {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn status(text: impl Into<String>) -> Self {
        Self::new(LineKind::Status, text)
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self::new(LineKind::Notice, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(LineKind::Error, text)
    }

    pub fn local(text: impl Into<String>) -> Self {
        Self::new(LineKind::Local, text)
    }

    pub fn remote(from: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(LineKind::Remote { from: from.into() }, text)
    }

    pub fn share(clip: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(LineKind::Share { clip: clip.into() }, text)
    }

    pub fn kind(&self) -> &LineKind {
        &self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.kind, LineKind::Remote { .. })
    }

    /// Text meant for the clipboard, if this is a share line
    pub fn clip(&self) -> Option<&str> {
        match &self.kind {
            LineKind::Share { clip } => Some(clip),
            _ => None,
        }
    }
}

impl fmt::Display for OutputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LineKind::Remote { from } => write!(f, "<{}> {}", from, self.text),
            LineKind::Local => write!(f, "> {}", self.text),
            LineKind::Error => write!(f, "! {}", self.text),
            LineKind::Status | LineKind::Notice | LineKind::Share { .. } => {
                write!(f, "* {}", self.text)
            }
        }
    }
}

/// One-way boundary receiving every line the session emits, in order
pub trait OutputSink: Send {
    fn output(&mut self, line: OutputLine);
}

impl<F> OutputSink for F
where
    F: FnMut(OutputLine) + Send,
{
    fn output(&mut self, line: OutputLine) {
        self(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert_eq!(OutputLine::remote("Bob", "hi").to_string(), "<Bob> hi");
        assert_eq!(OutputLine::local("hello").to_string(), "> hello");
        assert_eq!(OutputLine::error("nope").to_string(), "! nope");
        assert_eq!(OutputLine::status("Connected").to_string(), "* Connected");

        let share = OutputLine::share("ABC123", "Room ABC123");
        assert_eq!(share.to_string(), "* Room ABC123");
        assert_eq!(share.clip(), Some("ABC123"));
        assert_eq!(OutputLine::notice("x").clip(), None);
    }

    #[test]
    fn test_closure_sink() {
        let mut lines = Vec::new();
        {
            let mut sink = |line: OutputLine| lines.push(line);
            sink.output(OutputLine::notice("one"));
            sink.output(OutputLine::notice("two"));
        }

        let texts: Vec<_> = lines.iter().map(|l| l.text()).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn test_boxed_channel_sink() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut sink: Box<dyn OutputSink> = Box::new(move |line: OutputLine| {
            let _ = tx.send(line);
        });

        sink.output(OutputLine::remote("Ann", "hey"));
        drop(sink);

        let received: Vec<_> = rx.iter().collect();
        assert_eq!(received.len(), 1);
        assert!(received[0].is_remote());
    }

    #[test]
    fn test_serialization() {
        let line = OutputLine::remote("Ann", "hey");
        let json = serde_json::to_string(&line).unwrap();
        assert!(json.contains("\"kind\":\"remote\""));

        let back: OutputLine = serde_json::from_str(&json).unwrap();
        assert_eq!(back, line);
    }
}
