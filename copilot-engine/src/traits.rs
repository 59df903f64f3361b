use crate::transcript::ConversationState;
use chrono::{DateTime, Utc};

/// Source of unit timestamps. Injected so folding stays deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Notified after every committed change to the transcript store.
///
/// Called on the event loop; implementations must be fast and must not block.
pub trait TranscriptObserver: Send + Sync {
    fn transcript_changed(&self, state: &ConversationState);
}
