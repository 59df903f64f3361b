use crate::reconciler::reconcile;
use crate::traits::{Clock, SystemClock, TranscriptObserver};
use crate::transcript::{ConversationState, DisplayUnit, UserUnit};
use copilot_core::event::InboundEvent;
use std::sync::Arc;

/// Authoritative transcript and stage pointer for one session.
///
/// Owned by a single event loop; every mutation runs to completion before the next.
pub struct TranscriptStore {
    state: ConversationState,
    clock: Arc<dyn Clock>,
    observers: Vec<Arc<dyn TranscriptObserver>>,
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl TranscriptStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: ConversationState::new(),
            clock,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn TranscriptObserver>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn into_state(self) -> ConversationState {
        self.state
    }

    /// Folds an inbound event and notifies observers.
    pub fn apply_event(&mut self, event: InboundEvent) {
        let kind = event.kind();
        let prev_stage = self.state.stage;
        let now = self.clock.now();

        self.state = reconcile(std::mem::take(&mut self.state), event, now);

        if prev_stage != self.state.stage {
            log::info!("stage: {} -> {}", prev_stage, self.state.stage);
        }
        log::debug!(
            "applied {kind}; transcript has {} units",
            self.state.transcript.len()
        );
        self.notify();
    }

    /// Appends a locally originated user message.
    ///
    /// Bypasses the reconciler; the caller is expected to have rejected empty input and
    /// to transmit the matching intent.
    pub fn append_user(&mut self, text: impl Into<String>) -> DisplayUnit {
        let unit = DisplayUnit::User(UserUnit {
            text: text.into(),
            timestamp: self.clock.now(),
        });
        self.state.transcript.push(unit.clone());
        self.notify();
        unit
    }

    fn notify(&self) {
        for observer in &self.observers {
            observer.transcript_changed(&self.state);
        }
    }
}
