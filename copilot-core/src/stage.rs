use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// A step of the campaign workflow, in the fixed order the assistant walks them.
///
/// The order is only used for display (which steps count as completed). The protocol
/// itself may move the pointer to any stage, backwards included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Segment,
    Email,
    Journey,
    Deployment,
    Analytics,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown stage: {0}")]
pub struct UnknownStage(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepState {
    Active,
    Completed,
    Pending,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Segment,
        Stage::Email,
        Stage::Journey,
        Stage::Deployment,
        Stage::Analytics,
    ];

    pub fn index(self) -> usize {
        match self {
            Stage::Segment => 0,
            Stage::Email => 1,
            Stage::Journey => 2,
            Stage::Deployment => 3,
            Stage::Analytics => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Segment => "segment",
            Stage::Email => "email",
            Stage::Journey => "journey",
            Stage::Deployment => "deployment",
            Stage::Analytics => "analytics",
        }
    }

    // Stepper label. Deployment shows as "Deploy".
    pub fn label(self) -> &'static str {
        match self {
            Stage::Segment => "Segment",
            Stage::Email => "Email",
            Stage::Journey => "Journey",
            Stage::Deployment => "Deploy",
            Stage::Analytics => "Analytics",
        }
    }
}

/// True when `step` comes strictly before `current` in the workflow order.
pub fn is_completed(current: Stage, step: Stage) -> bool {
    current.index() > step.index()
}

pub fn step_state(current: Stage, step: Stage) -> StepState {
    if current == step {
        StepState::Active
    } else if is_completed(current, step) {
        StepState::Completed
    } else {
        StepState::Pending
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}
