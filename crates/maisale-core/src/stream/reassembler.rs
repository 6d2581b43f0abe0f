//! Client-side recovery of fragments from a raw event byte stream
//!
//! Network reads do not line up with event boundaries, so bytes are buffered
//! until a blank line closes an event. Buffering raw bytes also keeps
//! multi-byte characters intact when a read splits them.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CHUNK_FIELD_RE: Regex =
        Regex::new(r#""chunk"\s*:\s*"((?:\\.|[^"\\])*)""#).unwrap();
    static ref LEADING_OBJECT_RE: Regex = Regex::new(r"(?s)^\s*(\{[^}]*\})\s*(.*)$").unwrap();
}

const DATA_PREFIX: &str = "data:";

/// Incremental event parser
#[derive(Debug, Default)]
pub struct SseReassembler {
    buffer: Vec<u8>,
    pending_cr: bool,
}

impl SseReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one network read and return every fragment it completed
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.push_normalized(bytes);

        let mut fragments = Vec::new();
        while let Some(pos) = find_delimiter(&self.buffer) {
            let event: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            let text = String::from_utf8_lossy(&event[..pos]);
            fragments.extend(parse_event(&text, false));
        }
        fragments
    }

    /// End of stream: run whatever is still buffered through the same
    /// extraction chain instead of dropping it
    pub fn finish(mut self) -> Vec<String> {
        if self.pending_cr {
            self.buffer.push(b'\n');
            self.pending_cr = false;
        }
        let rest = std::mem::take(&mut self.buffer);
        let text = String::from_utf8_lossy(&rest);
        if text.trim().is_empty() {
            return Vec::new();
        }
        tracing::debug!("Flushing {} residual bytes", rest.len());
        parse_event(&text, true)
    }

    /// CRLF and lone CR become LF. A CR at the end of a read waits for the
    /// next byte.
    fn push_normalized(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if self.pending_cr {
                self.pending_cr = false;
                self.buffer.push(b'\n');
                if b == b'\n' {
                    continue;
                }
            }
            if b == b'\r' {
                self.pending_cr = true;
            } else {
                self.buffer.push(b);
            }
        }
    }
}

/// Parse a whole byte stream at once
pub fn reassemble_events(bytes: &[u8]) -> Vec<String> {
    let mut reassembler = SseReassembler::new();
    let mut fragments = reassembler.feed(bytes);
    fragments.extend(reassembler.finish());
    fragments
}

fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

/// Extract fragments from one event.
///
/// `residual` marks the unterminated tail of a stream; there an event without
/// `data:` lines is taken as payload as a whole.
fn parse_event(event: &str, residual: bool) -> Vec<String> {
    let event = event.trim();
    if event.is_empty() {
        return Vec::new();
    }

    let data_lines: Vec<&str> = event
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .map(str::trim)
        .collect();

    let payload = if !data_lines.is_empty() {
        data_lines.join("\n")
    } else if residual {
        event.to_string()
    } else {
        tracing::debug!("Ignoring event without data lines");
        return Vec::new();
    };

    let payload = match strip_leading_control(&payload) {
        Some(rest) if rest.is_empty() => return Vec::new(),
        Some(rest) => rest,
        None => payload,
    };

    extract_fragments(&payload)
}

/// Remove a leading `{"debug": ...}` object glued to the payload.
/// `None` when there is no such object.
fn strip_leading_control(payload: &str) -> Option<String> {
    let caps = LEADING_OBJECT_RE.captures(payload)?;
    let object = caps.get(1)?.as_str();
    let value: serde_json::Value = serde_json::from_str(object).ok()?;
    if value.get("debug").is_some() {
        Some(caps.get(2).map_or("", |m| m.as_str()).to_string())
    } else {
        None
    }
}

/// Structured parse first, then field extraction, then the raw payload
fn extract_fragments(payload: &str) -> Vec<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) {
        if value.get("debug").is_some() {
            return Vec::new();
        }
        if let Some(chunk) = value.get("chunk") {
            return match chunk {
                serde_json::Value::String(s) => vec![s.clone()],
                other => vec![other.to_string()],
            };
        }
    }

    let matches: Vec<String> = CHUNK_FIELD_RE
        .captures_iter(payload)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape_json_string(m.as_str()))
        .collect();
    if !matches.is_empty() {
        return matches;
    }

    let raw = payload
        .strip_prefix(DATA_PREFIX)
        .map(str::trim)
        .unwrap_or(payload);
    tracing::debug!("Using raw payload as fragment");
    vec![raw.to_string()]
}

fn unescape_json_string(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}
