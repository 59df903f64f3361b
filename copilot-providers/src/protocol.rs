use anyhow::{Context, anyhow};
use copilot_core::event::{InboundEvent, OutboundEvent};

const INBOUND_TYPES: [&str; 5] = [
    "stage_start",
    "thinking",
    "deployment_progress",
    "assistant_message",
    "state_update",
];

/// Decodes one inbound text frame.
///
/// Errors cover non-JSON input, a missing or unknown `type`, and payloads that don't
/// match the event shape (including unknown stage names).
pub fn parse_inbound_frame(s: &str) -> anyhow::Result<InboundEvent> {
    let v: serde_json::Value = serde_json::from_str(s).context("decode assistant json")?;
    let t = v
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("missing type"))?;

    if !INBOUND_TYPES.contains(&t) {
        return Err(anyhow!("unknown type: {t}"));
    }

    let t = t.to_owned();
    let event: InboundEvent =
        serde_json::from_value(v).with_context(|| format!("decode {t} payload"))?;
    Ok(event)
}

pub fn encode_outbound(event: &OutboundEvent) -> anyhow::Result<String> {
    serde_json::to_string(event).with_context(|| format!("encode {} event", event.kind()))
}
