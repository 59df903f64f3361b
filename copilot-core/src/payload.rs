use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// Counts arrive as JSON numbers, not necessarily integers (`3847.0`). Any finite,
// non-negative number is accepted and rounded to the nearest whole count.
fn count_from_value<E: serde::de::Error>(value: Value) -> Result<u64, E> {
    let Value::Number(n) = value else {
        return Err(E::custom("expected a number"));
    };
    if let Some(n) = n.as_u64() {
        return Ok(n);
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f >= 0.0 && f <= u64::MAX as f64 => Ok(f.round() as u64),
        _ => Err(E::custom(format!("invalid count: {n}"))),
    }
}

pub(crate) fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    count_from_value(Value::deserialize(deserializer)?)
}

pub(crate) fn deserialize_optional_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Option::deserialize(deserializer)?;
    value.map(count_from_value).transpose()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentData {
    pub suggestion: String,
    pub result: Vec<SegmentUser>,
    // Size of the whole matched audience; `result` may only be a sample of it.
    #[serde(
        default,
        deserialize_with = "deserialize_optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_matched: Option<u64>,
}

/// Rendered email template.
///
/// `html` is an opaque, trusted payload at this layer. Nothing here parses or sanitizes
/// it; a renderer that displays it as markup owns that concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailData {
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyData {
    pub plan: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub stage: String,
    #[serde(deserialize_with = "deserialize_count")]
    pub count: u64,
    pub rate: f64,
    // Percentage change from baseline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bottleneck {
    pub stage: String,
    pub dropoff_rate: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsData {
    pub funnel_stages: Vec<FunnelStage>,
    #[serde(deserialize_with = "deserialize_count")]
    pub total_impressions: u64,
    #[serde(deserialize_with = "deserialize_count")]
    pub total_leads: u64,
    pub overall_conversion_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottleneck: Option<Bottleneck>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Initializing,
    Deploying,
    Completed,
    Failed,
}

impl DeploymentStatus {
    pub fn label(self) -> &'static str {
        match self {
            DeploymentStatus::Initializing => "Initializing",
            DeploymentStatus::Deploying => "Deploying",
            DeploymentStatus::Completed => "Completed",
            DeploymentStatus::Failed => "Failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DeploymentStatus::Completed | DeploymentStatus::Failed)
    }
}

/// One progress report of a running campaign deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSnapshot {
    pub status: DeploymentStatus,
    pub progress_percent: f64,
    #[serde(deserialize_with = "deserialize_count")]
    pub total_recipients: u64,
    #[serde(deserialize_with = "deserialize_count")]
    pub success_count: u64,
    #[serde(deserialize_with = "deserialize_count")]
    pub failed_count: u64,
    pub current_phase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time_remaining: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throughput_per_second: Option<f64>,
}

impl DeploymentSnapshot {
    pub fn processed(&self) -> u64 {
        self.success_count.saturating_add(self.failed_count)
    }

    /// Share of processed recipients that were delivered, in percent.
    ///
    /// Zero until at least one recipient has been processed.
    pub fn success_rate(&self) -> f64 {
        let processed = self.processed();
        if self.total_recipients == 0 || processed == 0 {
            return 0.0;
        }
        self.success_count as f64 / processed as f64 * 100.0
    }

    pub fn failure_rate(&self) -> f64 {
        if self.total_recipients == 0 || self.processed() == 0 {
            return 0.0;
        }
        100.0 - self.success_rate()
    }
}
