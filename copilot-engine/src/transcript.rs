use chrono::{DateTime, Utc};
use copilot_core::payload::{AnalyticsData, DeploymentSnapshot, EmailData, JourneyData, SegmentData};
use copilot_core::stage::Stage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUnit {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantUnit {
    // Empty for units that only carry rich data.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub segment_data: Option<SegmentData>,
    pub email_data: Option<EmailData>,
    pub journey_data: Option<JourneyData>,
    pub analytics_data: Option<AnalyticsData>,
}

impl AssistantUnit {
    pub fn text(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            timestamp,
            segment_data: None,
            email_data: None,
            journey_data: None,
            analytics_data: None,
        }
    }

    pub fn has_rich_data(&self) -> bool {
        self.segment_data.is_some()
            || self.email_data.is_some()
            || self.journey_data.is_some()
            || self.analytics_data.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkingUnit {
    pub timestamp: DateTime<Utc>,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentUnit {
    pub timestamp: DateTime<Utc>,
    pub snapshot: DeploymentSnapshot,
}

/// One renderable element of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum DisplayUnit {
    User(UserUnit),
    Assistant(AssistantUnit),
    Thinking(ThinkingUnit),
    Deployment(DeploymentUnit),
}

impl DisplayUnit {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DisplayUnit::User(u) => u.timestamp,
            DisplayUnit::Assistant(u) => u.timestamp,
            DisplayUnit::Thinking(u) => u.timestamp,
            DisplayUnit::Deployment(u) => u.timestamp,
        }
    }

    pub fn is_thinking(&self) -> bool {
        matches!(self, DisplayUnit::Thinking(_))
    }
}

/// Transcript plus stage pointer for one conversation session.
///
/// Lives only as long as the session; nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub transcript: Vec<DisplayUnit>,
    pub stage: Stage,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thinking_count(&self) -> usize {
        self.transcript.iter().filter(|u| u.is_thinking()).count()
    }
}
