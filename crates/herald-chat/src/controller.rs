//! Drives one streamed turn at a time against the conversation state

use crate::{
    error::Result,
    events::{ChatEvent, TurnOutcome},
    message::Message,
    persona::{Persona, PromptRenderer},
    state::{Applied, ConversationState, Phase},
    transport::Transport,
};
use futures::StreamExt;
use herald_wire::{ChatRequest, StreamEvent, request::DEFAULT_AI_MODEL};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Persona to role-play
    pub persona: Persona,
    /// Capability tier requested from the service
    pub ai_model: String,
    /// Allow the service to consult external knowledge
    pub use_grounding: bool,
}

impl ChatConfig {
    pub fn new(persona: Persona) -> Self {
        Self {
            persona,
            ai_model: DEFAULT_AI_MODEL.to_string(),
            use_grounding: false,
        }
    }
}

/// Owns the conversation and runs turns against a [`Transport`].
///
/// Cloning is cheap and every clone shares the same conversation, so one
/// task can run [`submit`](Self::submit) while another calls
/// [`cancel`](Self::cancel).
#[derive(Clone)]
pub struct ConversationController {
    config: Arc<ChatConfig>,
    state: Arc<Mutex<ConversationState>>,
    transport: Arc<dyn Transport>,
    renderer: Arc<dyn PromptRenderer>,
    event_tx: broadcast::Sender<ChatEvent>,
}

impl ConversationController {
    /// Create a controller whose history starts with the persona's greeting
    pub fn new(config: ChatConfig, transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        let state = ConversationState::new(config.persona.fallback.clone())
            .with_greeting(config.persona.greeting.clone());
        let renderer = Arc::new(config.persona.template.clone());
        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(state)),
            transport,
            renderer,
            event_tx,
        }
    }

    /// Replace the persona template with a custom renderer
    pub fn with_renderer(mut self, renderer: Arc<dyn PromptRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Subscribe to conversation events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn persona(&self) -> &Persona {
        &self.config.persona
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase()
    }

    pub fn is_idle(&self) -> bool {
        self.state.lock().is_idle()
    }

    /// Snapshot of the committed history
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages().to_vec()
    }

    /// Snapshot of the in-flight text
    pub fn pending_buffer(&self) -> String {
        self.state.lock().pending_buffer().to_string()
    }

    /// Ask the in-flight request to stop. Returns false if nothing is running.
    pub fn cancel(&self) -> bool {
        let cancelled = self.state.lock().cancel();
        if cancelled {
            tracing::debug!("cancellation requested");
        }
        cancelled
    }

    /// Start over from the greeting. Refused while a turn is running.
    pub fn reset(&self) -> Result<()> {
        self.state
            .lock()
            .reset(Some(self.config.persona.greeting.as_str()))?;
        Ok(())
    }

    /// Run one turn for `user_text` to completion.
    ///
    /// Blank input or a turn already in flight is rejected without touching
    /// the state. Every accepted turn leaves the controller idle again, and
    /// failures are reported through the returned [`TurnOutcome`] (with the
    /// persona's fallback reply appended) rather than as an error.
    ///
    /// Dropping the returned future mid-turn (a timeout, a losing `select!`
    /// branch) ends the turn as cancelled.
    pub async fn submit(&self, user_text: &str) -> Result<TurnOutcome> {
        let cancel = CancellationToken::new();
        let user_message = self.state.lock().begin_turn(user_text, cancel.clone())?;

        let guard = TurnGuard {
            controller: self,
            cancel: cancel.clone(),
            armed: true,
        };
        let outcome = self.run_turn(user_message, cancel).await;
        guard.disarm();
        Ok(outcome)
    }

    async fn run_turn(&self, user_message: Message, cancel: CancellationToken) -> TurnOutcome {
        tracing::debug!(id = %user_message.id, "turn started");
        let prompt = self.renderer.render(&user_message.content);
        self.emit(ChatEvent::TurnStart {
            message: user_message,
        });
        self.emit(ChatEvent::PhaseChanged {
            phase: Phase::AwaitingFirstToken,
        });

        let request = ChatRequest::new(prompt)
            .with_ai_model(self.config.ai_model.clone())
            .with_grounding(self.config.use_grounding);

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(herald_wire::Error::Aborted),
            result = self.transport.stream(request, cancel.clone()) => result,
        };

        let body = match opened {
            Ok(body) => body,
            Err(e) if e.is_aborted() => return self.finish_cancelled(),
            Err(e) => {
                tracing::warn!("Generation request failed: {}", e);
                return self.finish_transport_failure(e.to_string());
            }
        };

        let mut events = herald_wire::decode(body);
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.finish_cancelled(),
                next = events.next() => next,
            };

            let Some(event) = next else {
                if cancel.is_cancelled() {
                    return self.finish_cancelled();
                }
                return self.finish_truncated();
            };

            if let Some(outcome) = self.apply(event) {
                return outcome;
            }
        }
    }

    /// Apply one event under the lock. Returns the outcome if it ended the turn.
    fn apply(&self, event: StreamEvent) -> Option<TurnOutcome> {
        let upstream_error = match &event {
            StreamEvent::Error { message } => Some(message.clone()),
            _ => None,
        };

        let (applied, phase, buffer) = {
            let mut state = self.state.lock();
            let before = state.phase();
            let applied = state.apply(event);
            let after = state.phase();
            let changed = (before != after && after != Phase::Idle).then_some(after);
            (applied, changed, state.pending_buffer().to_string())
        };

        if let Some(phase) = phase {
            self.emit(ChatEvent::PhaseChanged { phase });
        }

        match applied {
            Applied::BufferUpdated { delta } => {
                self.emit(ChatEvent::BufferUpdated { delta, buffer });
                None
            }
            Applied::Completed(message) => {
                Some(self.end_turn(Some(message), TurnOutcome::Completed))
            }
            Applied::Failed(fallback) => {
                let reason = upstream_error.unwrap_or_default();
                Some(self.end_turn(Some(fallback), TurnOutcome::Failed { reason }))
            }
            Applied::Ignored => None,
        }
    }

    fn finish_cancelled(&self) -> TurnOutcome {
        let committed = self.state.lock().acknowledge_cancel();
        let kept_partial = committed.is_some();
        tracing::debug!(kept_partial, "turn cancelled");
        self.end_turn(committed, TurnOutcome::Cancelled { kept_partial })
    }

    fn finish_truncated(&self) -> TurnOutcome {
        let (committed, kept_partial) = {
            let mut state = self.state.lock();
            let kept_partial = !state.pending_buffer().is_empty();
            (state.end_of_stream(), kept_partial)
        };
        tracing::warn!(kept_partial, "stream ended without a terminal record");
        self.end_turn(committed, TurnOutcome::Truncated { kept_partial })
    }

    fn finish_transport_failure(&self, reason: String) -> TurnOutcome {
        let committed = self.state.lock().fail_transport();
        self.end_turn(committed, TurnOutcome::Failed { reason })
    }

    fn end_turn(&self, committed: Option<Message>, outcome: TurnOutcome) -> TurnOutcome {
        if let Some(message) = committed {
            self.emit(ChatEvent::MessageCommitted { message });
        }
        self.emit(ChatEvent::PhaseChanged { phase: Phase::Idle });
        self.emit(ChatEvent::TurnEnd {
            outcome: outcome.clone(),
        });
        outcome
    }

    fn emit(&self, event: ChatEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Ends a turn whose `submit` future was dropped before the turn finished.
struct TurnGuard<'a> {
    controller: &'a ConversationController,
    cancel: CancellationToken,
    armed: bool,
}

impl TurnGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.cancel.cancel();
        let (committed, abandoned) = {
            let mut state = self.controller.state.lock();
            let abandoned = !state.is_idle();
            (state.acknowledge_cancel(), abandoned)
        };
        if abandoned {
            let kept_partial = committed.is_some();
            tracing::warn!(kept_partial, "turn dropped before it finished");
            self.controller
                .end_turn(committed, TurnOutcome::Cancelled { kept_partial });
        }
    }
}
