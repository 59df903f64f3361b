use std::sync::Arc;

use copilot_core::event::{InboundEvent, OutboundEvent};
use copilot_core::text::normalize_intent;
use copilot_engine::dedup::DedupGuard;
use copilot_engine::store::TranscriptStore;
use copilot_engine::traits::TranscriptObserver;
use copilot_engine::transcript::{ConversationState, DisplayUnit};
use copilot_providers::assistant_socket::AssistantSocketHandle;
use tokio::sync::mpsc;

/// Where outbound events go. Sends are fire-and-forget.
pub trait OutboundSink: Send + Sync {
    fn send(&self, event: OutboundEvent);
}

impl OutboundSink for AssistantSocketHandle {
    fn send(&self, event: OutboundEvent) {
        AssistantSocketHandle::send(self, event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Submit(String),
}

/// Single consumer of everything that mutates a session's transcript.
pub struct ChatService {
    store: TranscriptStore,
    guard: DedupGuard,
    outbound: Arc<dyn OutboundSink>,
}

impl ChatService {
    pub fn new(store: TranscriptStore, outbound: Arc<dyn OutboundSink>) -> Self {
        Self {
            store,
            guard: DedupGuard::new(),
            outbound,
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn TranscriptObserver>) {
        self.store.subscribe(observer);
    }

    pub fn state(&self) -> &ConversationState {
        self.store.state()
    }

    /// Records the user's message and sends it as an intent.
    ///
    /// Whitespace-only input is a no-op: no unit, nothing sent.
    pub fn submit(&mut self, text: &str) -> Option<DisplayUnit> {
        let Some(intent) = normalize_intent(text) else {
            log::debug!("ignoring empty submission");
            return None;
        };

        let unit = self.store.append_user(intent.clone());
        self.outbound.send(OutboundEvent::Intent { intent });
        Some(unit)
    }

    /// Returns false when the event was suppressed as a duplicate.
    pub fn handle_inbound(&mut self, event: InboundEvent) -> bool {
        if !self.guard.admit(&event) {
            return false;
        }
        self.store.apply_event(event);
        true
    }

    /// Runs the session loop until the action stream closes.
    ///
    /// Inbound events and user actions are handled one at a time, each to completion.
    /// Buffered inbound events are always folded before the next user action.
    /// When the assistant stream ends the loop keeps serving user actions; their
    /// intents are dropped by the disconnected sink.
    pub async fn run(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<InboundEvent>,
        mut actions: mpsc::Receiver<UserAction>,
    ) -> ConversationState {
        let mut inbound_closed = false;

        loop {
            tokio::select! {
                biased;

                ev = inbound.recv(), if !inbound_closed => {
                    match ev {
                        Some(ev) => {
                            self.handle_inbound(ev);
                        }
                        None => {
                            log::info!("assistant event stream ended");
                            inbound_closed = true;
                        }
                    }
                }
                action = actions.recv() => {
                    match action {
                        Some(UserAction::Submit(text)) => {
                            self.submit(&text);
                        }
                        None => break,
                    }
                }
            }
        }

        if self.guard.suppressed() > 0 {
            log::info!("suppressed {} duplicate events", self.guard.suppressed());
        }
        self.store.into_state()
    }
}
