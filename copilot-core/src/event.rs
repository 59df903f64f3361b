use crate::payload::{AnalyticsData, DeploymentSnapshot, SegmentUser, deserialize_optional_count};
use crate::stage::Stage;
use serde::{Deserialize, Serialize};

/// One decoded message pushed by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    StageStart { stage: Stage },
    Thinking { step: String },
    DeploymentProgress { progress: DeploymentSnapshot },
    AssistantMessage { message: String },
    StateUpdate { state: StateFields },
}

impl InboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::StageStart { .. } => "stage_start",
            InboundEvent::Thinking { .. } => "thinking",
            InboundEvent::DeploymentProgress { .. } => "deployment_progress",
            InboundEvent::AssistantMessage { .. } => "assistant_message",
            InboundEvent::StateUpdate { .. } => "state_update",
        }
    }
}

/// Optional sub-payloads of a `state_update`. Every field may be absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_result: Option<Vec<SegmentUser>>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub segment_total_matched: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journey_plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_data: Option<AnalyticsData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_step: Option<Stage>,
}

/// Messages the client sends to the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    Intent { intent: String },
    // Liveness probe, sent once right after the connection opens.
    Ping,
}

impl OutboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundEvent::Intent { .. } => "intent",
            OutboundEvent::Ping => "ping",
        }
    }
}
