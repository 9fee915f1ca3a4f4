//! Server-sent event framing.
//!
//! The parser is fed raw text chunks as they arrive and yields complete
//! events. Chunk boundaries may fall anywhere, including inside a line.

/// Event name used when the stream does not name one.
pub const DEFAULT_EVENT_NAME: &str = "message";

/// One server-pushed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    /// The `event:` field, or [`DEFAULT_EVENT_NAME`].
    pub event_name: String,
    /// The `data:` lines joined with `\n`.
    pub data: String,
}

/// Incremental server-sent event parser.
#[derive(Debug, Default)]
pub struct EventParser {
    buffer: String,
    event_name: Option<String>,
    data: Vec<String>,
}

impl EventParser {
    /// Creates an empty parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every event it completes.
    pub fn feed(&mut self, chunk: &str) -> Vec<StreamEvent> {
        self.buffer.push_str(chunk);
        let mut events = Vec::new();

        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.strip_prefix(' ').unwrap_or(value);
            match field {
                "event" => self.event_name = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }

        events
    }

    fn dispatch(&mut self) -> Option<StreamEvent> {
        let name = self.event_name.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(StreamEvent {
            event_name: name.unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string()),
            data,
        })
    }
}
