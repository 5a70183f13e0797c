//! Error types for herald-wire

use thiserror::Error;

/// Result type alias using herald-wire Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the generation service
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Service answered with a non-2xx status
    #[error("HTTP status {status}")]
    Status { status: u16 },

    /// Request was cancelled before the response arrived
    #[error("Request aborted")]
    Aborted,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether this error came from the caller cancelling the request
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }
}

/// A line of the response body that could not be turned into an event.
///
/// These never reach the conversation; the decoder logs and drops them.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The `data: ` payload was not valid JSON of the expected shape
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Valid JSON, but none of `error`, `done` or a non-empty `token`
    #[error("record carries no event")]
    Empty,
}
