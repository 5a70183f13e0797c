//! Error types for herald-chat

use thiserror::Error;

/// Result type alias using herald-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Why a submission or reset was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Input was empty or whitespace only
    EmptyInput,
    /// A turn is already in flight
    Busy,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::EmptyInput => write!(f, "nothing to send"),
            Rejection::Busy => write!(f, "a response is still being generated"),
        }
    }
}

/// Errors that can occur during conversation operations
#[derive(Error, Debug)]
pub enum Error {
    /// The controller refused the operation; state is unchanged
    #[error("Rejected: {0}")]
    Rejected(Rejection),

    /// An error from the wire layer
    #[error(transparent)]
    Wire(#[from] herald_wire::Error),
}

impl From<Rejection> for Error {
    fn from(rejection: Rejection) -> Self {
        Error::Rejected(rejection)
    }
}

impl Error {
    /// Get the rejection reason, if this is a rejection
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Error::Rejected(r) => Some(*r),
            _ => None,
        }
    }
}
