use copilot_core::event::InboundEvent;

/// Suppresses an inbound event whose content is identical to the one accepted right
/// before it.
///
/// The fingerprint is the canonical JSON encoding of the event, with no arrival-time
/// component: a redelivered frame compares equal to the original.
#[derive(Debug, Default)]
pub struct DedupGuard {
    last: Option<String>,
    suppressed: u64,
}

impl DedupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the event should be folded.
    pub fn admit(&mut self, event: &InboundEvent) -> bool {
        let Some(fp) = fingerprint(event) else {
            // Can't compare what we can't encode; let it through.
            self.last = None;
            return true;
        };

        if self.last.as_deref() == Some(fp.as_str()) {
            self.suppressed = self.suppressed.saturating_add(1);
            log::debug!("suppressed duplicate {} event", event.kind());
            return false;
        }

        self.last = Some(fp);
        true
    }

    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

fn fingerprint(event: &InboundEvent) -> Option<String> {
    serde_json::to_string(event).ok()
}
