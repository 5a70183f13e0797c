//! Conversation state and its transitions
//!
//! [`ConversationState`] is plain data plus synchronous transition methods.
//! It never performs I/O; the controller feeds it one event at a time.
//!
//! Invariant: `active_request` is `Some` exactly when `phase != Idle`, and the
//! pending buffer is empty whenever the phase is `Idle`.

use crate::error::Rejection;
use crate::message::Message;
use herald_wire::StreamEvent;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Lifecycle of the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No turn in flight
    Idle,
    /// Request sent, nothing received yet
    AwaitingFirstToken,
    /// At least one token received
    Streaming,
}

/// What applying a stream event did to the state
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// A token was appended; carries the new fragment
    BufferUpdated { delta: String },
    /// `Done`: the buffer was committed as this message
    Completed(Message),
    /// `Error`: the buffer was discarded and this fallback appended
    Failed(Message),
    /// No turn in flight; the event was dropped
    Ignored,
}

/// Conversation history plus the in-flight turn
#[derive(Debug)]
pub struct ConversationState {
    messages: Vec<Message>,
    pending_buffer: String,
    phase: Phase,
    active_request: Option<CancellationToken>,
    fallback: String,
}

impl ConversationState {
    /// Create an empty conversation. `fallback` is the fixed reply appended
    /// when a turn fails.
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            pending_buffer: String::new(),
            phase: Phase::Idle,
            active_request: None,
            fallback: fallback.into(),
        }
    }

    /// Seed the history with the persona's greeting
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.messages.push(Message::greeting(greeting));
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Text accumulated for the in-flight turn (empty when idle)
    pub fn pending_buffer(&self) -> &str {
        &self.pending_buffer
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn has_active_request(&self) -> bool {
        self.active_request.is_some()
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Start a turn: append the user's (trimmed) message and move to
    /// `AwaitingFirstToken`, holding `cancel` as the active request.
    pub fn begin_turn(
        &mut self,
        user_text: &str,
        cancel: CancellationToken,
    ) -> Result<Message, Rejection> {
        let text = user_text.trim();
        if text.is_empty() {
            return Err(Rejection::EmptyInput);
        }
        if !self.is_idle() {
            return Err(Rejection::Busy);
        }

        let message = Message::user(text);
        self.messages.push(message.clone());
        self.pending_buffer.clear();
        self.phase = Phase::AwaitingFirstToken;
        self.active_request = Some(cancel);
        Ok(message)
    }

    /// Fold one decoded event into the state
    pub fn apply(&mut self, event: StreamEvent) -> Applied {
        if self.is_idle() {
            return Applied::Ignored;
        }

        match event {
            StreamEvent::Token { text } => {
                if self.phase == Phase::AwaitingFirstToken {
                    self.phase = Phase::Streaming;
                }
                self.pending_buffer.push_str(&text);
                Applied::BufferUpdated { delta: text }
            }
            StreamEvent::Done => {
                let content = std::mem::take(&mut self.pending_buffer);
                let message = self.commit(Message::assistant(content));
                self.finish();
                Applied::Completed(message)
            }
            StreamEvent::Error { message } => {
                tracing::warn!(error = %message, "upstream reported an error");
                let fallback = self.append_fallback();
                self.finish();
                Applied::Failed(fallback)
            }
        }
    }

    /// Signal the active request to stop. Returns false when idle.
    ///
    /// The state itself only changes once the transport acknowledges, via
    /// [`ConversationState::acknowledge_cancel`].
    pub fn cancel(&self) -> bool {
        match &self.active_request {
            Some(token) if !self.is_idle() => {
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// The transport stopped after a cancellation. A non-empty partial answer
    /// is kept.
    pub fn acknowledge_cancel(&mut self) -> Option<Message> {
        if self.is_idle() {
            return None;
        }
        let committed = self.commit_partial();
        self.finish();
        committed
    }

    /// The stream ended with no terminal event and no cancellation. Keeps a
    /// partial answer if there is one, otherwise appends the fallback.
    pub fn end_of_stream(&mut self) -> Option<Message> {
        if self.is_idle() {
            return None;
        }
        let committed = self
            .commit_partial()
            .unwrap_or_else(|| self.append_fallback());
        self.finish();
        Some(committed)
    }

    /// The request failed before any stream was available
    pub fn fail_transport(&mut self) -> Option<Message> {
        if self.is_idle() {
            return None;
        }
        let fallback = self.append_fallback();
        self.finish();
        Some(fallback)
    }

    /// Drop the history back to `greeting` only. Refused mid-turn.
    pub fn reset(&mut self, greeting: Option<&str>) -> Result<(), Rejection> {
        if !self.is_idle() {
            return Err(Rejection::Busy);
        }
        self.messages.clear();
        if let Some(greeting) = greeting {
            self.messages.push(Message::greeting(greeting));
        }
        Ok(())
    }

    fn commit(&mut self, message: Message) -> Message {
        self.messages.push(message.clone());
        message
    }

    fn commit_partial(&mut self) -> Option<Message> {
        if self.pending_buffer.is_empty() {
            return None;
        }
        let content = std::mem::take(&mut self.pending_buffer);
        Some(self.commit(Message::assistant(content)))
    }

    fn append_fallback(&mut self) -> Message {
        self.pending_buffer.clear();
        let fallback = Message::assistant(self.fallback.clone());
        self.commit(fallback)
    }

    fn finish(&mut self) {
        self.pending_buffer.clear();
        self.phase = Phase::Idle;
        self.active_request = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "Pardonnez-moi, mes amis...";

    fn state() -> ConversationState {
        ConversationState::new(FALLBACK).with_greeting("Bonjour")
    }

    fn started() -> (ConversationState, CancellationToken) {
        let mut s = state();
        let token = CancellationToken::new();
        s.begin_turn("Wie bent u?", token.clone()).unwrap();
        (s, token)
    }

    fn assert_idle(s: &ConversationState) {
        assert_eq!(s.phase(), Phase::Idle);
        assert!(!s.has_active_request());
        assert!(s.pending_buffer().is_empty());
    }

    fn assistant_contents(s: &ConversationState) -> Vec<&str> {
        s.messages()
            .iter()
            .skip(1)
            .filter(|m| m.is_assistant())
            .map(|m| m.content.as_str())
            .collect()
    }

    #[test]
    fn test_new_state_is_idle_with_greeting() {
        let s = state();
        assert_idle(&s);
        assert_eq!(s.messages().len(), 1);
        assert_eq!(s.messages()[0].id, "welcome");
    }

    #[test]
    fn test_begin_turn_appends_trimmed_user_message() {
        let (s, _) = started();
        assert_eq!(s.phase(), Phase::AwaitingFirstToken);
        assert!(s.has_active_request());
        let last = s.messages().last().unwrap();
        assert!(last.is_user());
        assert_eq!(last.content, "Wie bent u?");
    }

    #[test]
    fn test_blank_input_rejected_without_change() {
        let mut s = state();
        for input in ["", "   ", "\n\t"] {
            let err = s.begin_turn(input, CancellationToken::new()).unwrap_err();
            assert_eq!(err, Rejection::EmptyInput);
        }
        assert_eq!(s.messages().len(), 1);
        assert_idle(&s);
    }

    #[test]
    fn test_second_turn_rejected_while_busy() {
        let (mut s, _) = started();
        let err = s.begin_turn("again", CancellationToken::new()).unwrap_err();
        assert_eq!(err, Rejection::Busy);
        assert_eq!(s.messages().len(), 2);
        assert_eq!(s.phase(), Phase::AwaitingFirstToken);
    }

    #[test]
    fn test_tokens_then_done_commit_buffer() {
        let (mut s, _) = started();
        assert_eq!(
            s.apply(StreamEvent::token("Bonjour ")),
            Applied::BufferUpdated {
                delta: "Bonjour ".into()
            }
        );
        assert_eq!(s.phase(), Phase::Streaming);
        s.apply(StreamEvent::token("mes amis"));
        assert_eq!(s.pending_buffer(), "Bonjour mes amis");

        let Applied::Completed(msg) = s.apply(StreamEvent::Done) else {
            panic!("expected completion");
        };
        assert_eq!(msg.content, "Bonjour mes amis");
        assert_eq!(s.messages().last(), Some(&msg));
        assert_idle(&s);
    }

    #[test]
    fn test_done_before_any_token_commits_empty_message() {
        let (mut s, _) = started();
        let Applied::Completed(msg) = s.apply(StreamEvent::Done) else {
            panic!("expected completion");
        };
        assert!(msg.content.is_empty());
        assert_idle(&s);
    }

    #[test]
    fn test_error_discards_partial_and_appends_fallback() {
        let (mut s, _) = started();
        s.apply(StreamEvent::token("partial"));
        let Applied::Failed(msg) = s.apply(StreamEvent::error("x")) else {
            panic!("expected failure");
        };
        assert_eq!(msg.content, FALLBACK);
        assert_eq!(assistant_contents(&s), vec![FALLBACK]);
        assert_idle(&s);
    }

    #[test]
    fn test_error_before_first_token() {
        let (mut s, _) = started();
        assert!(matches!(s.apply(StreamEvent::error("x")), Applied::Failed(_)));
        assert_idle(&s);
    }

    #[test]
    fn test_events_ignored_when_idle() {
        let mut s = state();
        assert_eq!(s.apply(StreamEvent::token("stray")), Applied::Ignored);
        assert_eq!(s.apply(StreamEvent::Done), Applied::Ignored);
        assert_eq!(s.messages().len(), 1);
    }

    #[test]
    fn test_cancel_signals_token_but_waits_for_ack() {
        let (s, token) = started();
        assert!(s.cancel());
        assert!(token.is_cancelled());
        assert_eq!(s.phase(), Phase::AwaitingFirstToken);
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        assert!(!state().cancel());
    }

    #[test]
    fn test_cancel_ack_keeps_partial_answer() {
        let (mut s, _) = started();
        s.apply(StreamEvent::token("he"));
        s.apply(StreamEvent::token("llo"));
        s.cancel();
        let msg = s.acknowledge_cancel().unwrap();
        assert_eq!(msg.content, "hello");
        assert_eq!(assistant_contents(&s), vec!["hello"]);
        assert_idle(&s);
    }

    #[test]
    fn test_cancel_ack_with_empty_buffer_commits_nothing() {
        let (mut s, _) = started();
        s.cancel();
        assert!(s.acknowledge_cancel().is_none());
        assert_eq!(s.messages().len(), 2);
        assert_idle(&s);
    }

    #[test]
    fn test_end_of_stream_keeps_partial() {
        let (mut s, _) = started();
        s.apply(StreamEvent::token("half an answer"));
        let msg = s.end_of_stream().unwrap();
        assert_eq!(msg.content, "half an answer");
        assert_idle(&s);
    }

    #[test]
    fn test_end_of_stream_without_tokens_appends_fallback() {
        let (mut s, _) = started();
        let msg = s.end_of_stream().unwrap();
        assert_eq!(msg.content, FALLBACK);
        assert_idle(&s);
    }

    #[test]
    fn test_transport_failure_appends_fallback() {
        let (mut s, _) = started();
        let msg = s.fail_transport().unwrap();
        assert_eq!(msg.content, FALLBACK);
        assert_idle(&s);
        assert!(s.fail_transport().is_none());
    }

    #[test]
    fn test_new_turn_possible_after_every_ending() {
        let endings: Vec<fn(&mut ConversationState)> = vec![
            |s: &mut ConversationState| {
                s.apply(StreamEvent::Done);
            },
            |s: &mut ConversationState| {
                s.apply(StreamEvent::error("boom"));
            },
            |s: &mut ConversationState| {
                s.acknowledge_cancel();
            },
            |s: &mut ConversationState| {
                s.end_of_stream();
            },
            |s: &mut ConversationState| {
                s.fail_transport();
            },
        ];
        for end in endings {
            let (mut s, _) = started();
            s.apply(StreamEvent::token("x"));
            end(&mut s);
            assert_idle(&s);
            assert!(s.begin_turn("next", CancellationToken::new()).is_ok());
        }
    }

    #[test]
    fn test_reset_refused_mid_turn() {
        let (mut s, _) = started();
        assert_eq!(s.reset(Some("Bonjour")), Err(Rejection::Busy));
    }

    #[test]
    fn test_reset_restores_greeting() {
        let (mut s, _) = started();
        s.apply(StreamEvent::Done);
        s.reset(Some("Bonjour")).unwrap();
        assert_eq!(s.messages().len(), 1);
        assert_eq!(s.messages()[0].content, "Bonjour");
    }
}
