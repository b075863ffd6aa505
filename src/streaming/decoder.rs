//! Line splitting and event decoding for the chat response body
//!
//! The backend writes one event per line, `data: <payload>`, where the
//! payload is either the literal `[DONE]` or a JSON object. Other lines
//! (blank separators, comments, `event:` fields) carry nothing for us.

use crate::backend::ErrorBody;
use serde::Deserialize;
use thiserror::Error;

/// Terminal marker sent by the backend instead of a JSON payload
pub const DONE_MARKER: &str = "[DONE]";

/// One decoded unit of the response stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A content fragment, never empty
    Token(String),
    /// The backend finished the turn
    Done,
    /// The backend reported an error inside the stream
    Failed { code: String, message: String },
}

/// A single event that could not be decoded
///
/// Only the offending line is lost; the stream carries on.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("undecodable stream event ({reason}): {payload}")]
pub struct DecodeError {
    /// Raw payload after the `data:` prefix
    pub payload: String,
    /// What was wrong with it
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

/// Decodes one line of the response body
///
/// Lines that are not `data:` lines decode to nothing. A payload with both
/// a token and `done: true` yields the token first, then [`StreamEvent::Done`].
/// Empty tokens are dropped.
///
/// # Examples
///
/// ```
/// use chatline::streaming::decoder::{decode_line, StreamEvent};
///
/// let events = decode_line(r#"data: {"token":"Hi","done":true}"#).unwrap();
/// assert_eq!(events, vec![StreamEvent::Token("Hi".into()), StreamEvent::Done]);
/// assert!(decode_line(": keep-alive").unwrap().is_empty());
/// assert!(decode_line("data: {not json").is_err());
/// ```
pub fn decode_line(line: &str) -> Result<Vec<StreamEvent>, DecodeError> {
    let payload = match line.strip_prefix("data:") {
        Some(rest) => rest.trim(),
        None => return Ok(Vec::new()),
    };

    if payload.is_empty() {
        return Ok(Vec::new());
    }
    if payload == DONE_MARKER {
        return Ok(vec![StreamEvent::Done]);
    }

    let parsed: EventPayload = serde_json::from_str(payload).map_err(|e| DecodeError {
        payload: payload.to_string(),
        reason: e.to_string(),
    })?;

    if let Some(error) = parsed.error {
        return Ok(vec![StreamEvent::Failed {
            code: error.code,
            message: error.message,
        }]);
    }

    if parsed.token.is_none() && parsed.done.is_none() {
        return Err(DecodeError {
            payload: payload.to_string(),
            reason: "no token, done or error field".to_string(),
        });
    }

    let mut events = Vec::with_capacity(2);
    if let Some(token) = parsed.token.filter(|t| !t.is_empty()) {
        events.push(StreamEvent::Token(token));
    }
    if parsed.done == Some(true) {
        events.push(StreamEvent::Done);
    }
    Ok(events)
}

/// Reassembles lines from arbitrarily split body chunks
///
/// Works on bytes so a multi-byte character split across two chunks is
/// joined before it is decoded as UTF-8.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Creates an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every line it completed, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            lines.push(to_line(&self.buffer[start..end]));
            start = end + 1;
        }
        self.buffer.drain(..start);
        lines
    }

    /// Returns the unterminated tail left at end of stream, if any
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = to_line(&self.buffer);
        self.buffer.clear();
        Some(line)
    }
}

fn to_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
