use std::io::Write;
use tandem_session_core::{Language, Messages, OutputLine, OutputSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `<name> text` style lines for people
    #[default]
    Plain,
    /// One serialized [`OutputLine`] per line for programs
    Json,
}

/// Writes session output to a terminal or pipe
pub struct ConsoleSink {
    writer: Box<dyn Write + Send>,
    format: OutputFormat,
    messages: Messages,
    copy_to_clipboard: bool,
}

impl ConsoleSink {
    pub fn new(writer: impl Write + Send + 'static, language: Language) -> Self {
        Self {
            writer: Box::new(writer),
            format: OutputFormat::default(),
            messages: Messages::new(language),
            copy_to_clipboard: false,
        }
    }

    pub fn stdout(language: Language) -> Self {
        Self::new(std::io::stdout(), language)
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Copy room codes and invite links as they are shown
    pub fn with_clipboard(mut self, enabled: bool) -> Self {
        self.copy_to_clipboard = enabled;
        self
    }

    pub fn render(&self, line: &OutputLine) -> String {
        match self.format {
            OutputFormat::Plain => line.to_string(),
            OutputFormat::Json => serde_json::to_string(line).unwrap_or_else(|e| {
                tracing::error!(error = %e, "failed to serialize output line");
                line.to_string()
            }),
        }
    }

    fn write_line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.writer, "{text}").and_then(|()| self.writer.flush()) {
            tracing::warn!(error = %e, "failed to write output");
        }
    }

    #[cfg(feature = "clipboard")]
    fn copy(&mut self, clip: &str) {
        let copied = arboard::Clipboard::new().and_then(|mut board| board.set_text(clip));
        match copied {
            Ok(()) => {
                let line = OutputLine::notice(self.messages.copied());
                let text = self.render(&line);
                self.write_line(&text);
            }
            Err(e) => tracing::warn!(error = %e, "clipboard unavailable"),
        }
    }

    #[cfg(not(feature = "clipboard"))]
    fn copy(&mut self, _clip: &str) {
        tracing::debug!(language = %self.messages.language(), "built without clipboard support");
    }
}

impl OutputSink for ConsoleSink {
    fn output(&mut self, line: OutputLine) {
        let text = self.render(&line);
        self.write_line(&text);

        if self.copy_to_clipboard {
            if let Some(clip) = line.clip() {
                self.copy(clip);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_plain_output() {
        let buffer = SharedBuffer::default();
        let mut sink = ConsoleSink::new(buffer.clone(), Language::En);

        sink.output(OutputLine::remote("Bob", "hi"));
        sink.output(OutputLine::local("hello"));

        assert_eq!(buffer.contents(), "<Bob> hi\n> hello\n");
    }

    #[test]
    fn test_json_output() {
        let buffer = SharedBuffer::default();
        let mut sink = ConsoleSink::new(buffer.clone(), Language::En).with_format(OutputFormat::Json);

        sink.output(OutputLine::share("ABC123", "Room ABC123"));

        let value: serde_json::Value = serde_json::from_str(buffer.contents().trim()).unwrap();
        assert_eq!(value["kind"]["kind"], "share");
        assert_eq!(value["kind"]["clip"], "ABC123");
        assert_eq!(value["text"], "Room ABC123");
    }
}
