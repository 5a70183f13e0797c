//! Conversation event types

use crate::message::Message;
use crate::state::Phase;
use serde::{Deserialize, Serialize};

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The service finished the answer
    Completed,
    /// The request or the service failed; the fallback reply was appended
    Failed { reason: String },
    /// The user stopped generation
    Cancelled { kept_partial: bool },
    /// The stream ended without a terminal record
    Truncated { kept_partial: bool },
}

impl TurnOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TurnOutcome::Completed)
    }
}

/// Notifications emitted while the controller runs a turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A user message was accepted and a request is being sent
    TurnStart { message: Message },

    /// The turn moved to a new phase
    PhaseChanged { phase: Phase },

    /// New text arrived; `buffer` is everything received so far this turn
    BufferUpdated { delta: String, buffer: String },

    /// A message was appended to the history
    MessageCommitted { message: Message },

    /// The turn is over and the controller is idle again
    TurnEnd { outcome: TurnOutcome },
}

impl ChatEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::TurnEnd { .. })
    }
}
