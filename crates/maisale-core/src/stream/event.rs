//! Wire events

/// Payload of the first event on every stream
pub const OPEN_PAYLOAD: &str = r#"{"debug": "stream-open"}"#;

/// One discrete unit on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Connection is live; always first
    Open,
    /// A generated text fragment
    Chunk(String),
    /// User-readable failure text; carried as a chunk so clients show it
    Error(String),
}

impl StreamEvent {
    /// Text a client appends for this event
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Open => None,
            StreamEvent::Chunk(text) | StreamEvent::Error(text) => Some(text),
        }
    }

    /// Render as `data: <json>` followed by a blank line
    pub fn encode(&self) -> String {
        match self {
            StreamEvent::Open => format!("data: {}\n\n", OPEN_PAYLOAD),
            StreamEvent::Chunk(text) | StreamEvent::Error(text) => {
                let quoted = serde_json::Value::String(text.clone());
                format!("data: {{\"chunk\": {}}}\n\n", quoted)
            }
        }
    }
}
