use crate::transcript::{AssistantUnit, ConversationState, DeploymentUnit, DisplayUnit, ThinkingUnit};
use chrono::{DateTime, Utc};
use copilot_core::event::{InboundEvent, StateFields};
use copilot_core::payload::{EmailData, JourneyData, SegmentData};
use copilot_core::text::non_empty;

/// Folds one accepted event into the conversation state.
///
/// Total over `InboundEvent`: every event yields a new state and nothing can fail.
/// `now` stamps any unit created by this event.
pub fn reconcile(
    mut state: ConversationState,
    event: InboundEvent,
    now: DateTime<Utc>,
) -> ConversationState {
    match event {
        InboundEvent::StageStart { stage } => {
            state.stage = stage;
        }
        InboundEvent::Thinking { step } => {
            if let Some(DisplayUnit::Thinking(open)) = state.transcript.last_mut() {
                open.steps.push(step);
            } else {
                state.transcript.push(DisplayUnit::Thinking(ThinkingUnit {
                    timestamp: now,
                    steps: vec![step],
                }));
            }
        }
        InboundEvent::DeploymentProgress { progress } => {
            if let Some(DisplayUnit::Deployment(live)) = state.transcript.last_mut() {
                live.snapshot = progress;
            } else {
                state.transcript.push(DisplayUnit::Deployment(DeploymentUnit {
                    timestamp: now,
                    snapshot: progress,
                }));
            }
        }
        InboundEvent::AssistantMessage { message } => {
            // Every thinking block goes, not just the tail. Deployment units stay.
            state.transcript.retain(|u| !u.is_thinking());
            state
                .transcript
                .push(DisplayUnit::Assistant(AssistantUnit::text(message, now)));
        }
        InboundEvent::StateUpdate { state: fields } => {
            let stage = fields.conversation_step;
            if let Some(unit) = rich_unit_from_fields(fields, now) {
                state.transcript.push(DisplayUnit::Assistant(unit));
            }
            if let Some(stage) = stage {
                state.stage = stage;
            }
        }
    }
    state
}

/// Builds the assistant unit carried by a `state_update`, if it carries any rich data.
pub fn rich_unit_from_fields(fields: StateFields, now: DateTime<Utc>) -> Option<AssistantUnit> {
    let StateFields {
        segment_suggestion,
        segment_result,
        segment_total_matched,
        email_html,
        journey_plan,
        schedule_hint,
        analytics_data,
        conversation_step: _,
    } = fields;

    let mut unit = AssistantUnit::text(String::new(), now);

    // An empty result list still counts as segment data; an empty suggestion does not.
    let segment_suggestion = non_empty(segment_suggestion);
    if segment_suggestion.is_some() || segment_result.is_some() {
        unit.segment_data = Some(SegmentData {
            suggestion: segment_suggestion.unwrap_or_default(),
            result: segment_result.unwrap_or_default(),
            total_matched: segment_total_matched,
        });
    }

    unit.email_data = non_empty(email_html).map(|html| EmailData { html });

    let journey_plan = non_empty(journey_plan);
    let schedule_hint = non_empty(schedule_hint);
    if journey_plan.is_some() || schedule_hint.is_some() {
        unit.journey_data = Some(JourneyData {
            plan: journey_plan.unwrap_or_default(),
            schedule_hint,
        });
    }

    unit.analytics_data = analytics_data;

    unit.has_rich_data().then_some(unit)
}
