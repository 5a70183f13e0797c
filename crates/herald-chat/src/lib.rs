//! herald-chat: conversation runtime for streamed persona chat
//!
//! This crate owns the conversation history and drives one streamed
//! generation request per user turn, folding decoded events into state.

pub mod controller;
pub mod error;
pub mod events;
pub mod message;
pub mod persona;
pub mod state;
pub mod transport;

pub use controller::{ChatConfig, ConversationController};
pub use error::{Error, Rejection, Result};
pub use events::{ChatEvent, TurnOutcome};
pub use message::{Message, Role};
pub use persona::{Persona, PromptRenderer, PromptTemplate};
pub use state::{Applied, ConversationState, Phase};
pub use transport::Transport;
