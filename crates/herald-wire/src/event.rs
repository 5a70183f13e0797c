//! Streaming event types

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message used when an upstream error record carries no text
const DEFAULT_ERROR_MESSAGE: &str = "Streaming error";

/// Events decoded from the generation stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental text fragment
    Token { text: String },
    /// Generation finished successfully
    Done,
    /// Upstream reported a failure
    Error { message: String },
}

impl StreamEvent {
    /// Create a token event
    pub fn token(text: impl Into<String>) -> Self {
        Self::Token { text: text.into() }
    }

    /// Create an error event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }

    /// Parse the JSON payload of a `data: ` line.
    ///
    /// Precedence follows the service: an error flag wins over done, done wins
    /// over a token. The flags are read loosely, so any truthy value counts
    /// (`{"error":"quota"}` is an error whose text is `quota`). Empty tokens
    /// carry nothing to display and are rejected.
    pub fn from_record(payload: &str) -> Result<Self, ProtocolError> {
        let record: WireRecord = serde_json::from_str(payload)?;

        if is_truthy(&record.error) {
            let message = record
                .message
                .filter(|m| !m.is_empty())
                .or_else(|| record.error.as_str().map(str::to_string))
                .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());
            return Ok(StreamEvent::Error { message });
        }
        if is_truthy(&record.done) {
            return Ok(StreamEvent::Done);
        }
        match record.token {
            Some(text) if !text.is_empty() => Ok(StreamEvent::Token { text }),
            _ => Err(ProtocolError::Empty),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    #[serde(default)]
    error: Value,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    done: Value,
    #[serde(default)]
    token: Option<String>,
}

/// JavaScript truthiness, which is how the service's clients read the flags
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
