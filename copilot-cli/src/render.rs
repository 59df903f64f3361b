use std::sync::Mutex;

use copilot_core::payload::DeploymentSnapshot;
use copilot_core::stage::{Stage, StepState, step_state};
use copilot_engine::traits::TranscriptObserver;
use copilot_engine::transcript::{AssistantUnit, ConversationState, DisplayUnit};

// What has already been printed.
#[derive(Debug, Default)]
struct Cursor {
    len: usize,
    stage: Option<Stage>,
    tail: Option<DisplayUnit>,
}

/// Prints transcript changes to stdout as plain text.
#[derive(Debug, Default)]
pub struct ConsoleRenderer {
    cursor: Mutex<Cursor>,
}

impl ConsoleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for this change, given what was printed before.
    fn updates(&self, state: &ConversationState) -> Vec<String> {
        let Ok(mut cursor) = self.cursor.lock() else {
            return vec![];
        };
        let mut out = vec![];

        if cursor.stage != Some(state.stage) {
            out.push(render_stepper(state.stage));
            cursor.stage = Some(state.stage);
        }

        let len = state.transcript.len();
        let tail = state.transcript.last();
        if len > cursor.len {
            out.extend(state.transcript[cursor.len..].iter().map(render_unit));
        } else if let Some(tail) = tail.filter(|t| cursor.tail.as_ref() != Some(*t)) {
            // Same length or shorter: the tail was updated in place or replaced.
            out.push(render_tail_update(tail));
        }
        cursor.len = len;
        cursor.tail = tail.cloned();
        out
    }
}

impl TranscriptObserver for ConsoleRenderer {
    fn transcript_changed(&self, state: &ConversationState) {
        for line in self.updates(state) {
            println!("{line}");
        }
    }
}

pub fn render_stepper(current: Stage) -> String {
    let pills: Vec<String> = Stage::ALL
        .into_iter()
        .map(|stage| {
            let n = stage.index() + 1;
            match step_state(current, stage) {
                StepState::Active => format!("[{n} {}]", stage.label()),
                StepState::Completed => format!("({n} {} ✓)", stage.label()),
                StepState::Pending => format!(" {n} {} ", stage.label()),
            }
        })
        .collect();
    pills.join(" > ")
}

pub fn render_unit(unit: &DisplayUnit) -> String {
    match unit {
        DisplayUnit::User(u) => format!("you> {}", u.text),
        DisplayUnit::Assistant(a) => render_assistant(a),
        DisplayUnit::Thinking(t) => {
            let mut out = String::from("copilot is thinking...");
            for step in &t.steps {
                out.push_str(&format!("\n  ✓ {step}"));
            }
            out
        }
        DisplayUnit::Deployment(d) => render_deployment(&d.snapshot),
    }
}

fn render_tail_update(unit: &DisplayUnit) -> String {
    match unit {
        DisplayUnit::Thinking(t) => match t.steps.last() {
            Some(step) => format!("  ✓ {step}"),
            None => String::new(),
        },
        other => render_unit(other),
    }
}

fn render_assistant(a: &AssistantUnit) -> String {
    let mut lines = vec![];
    if !a.text.is_empty() {
        lines.push(format!("copilot> {}", a.text.trim_end()));
    }
    if let Some(seg) = &a.segment_data {
        lines.push(format!("  segment: {}", seg.suggestion.trim_end()));
        let matched = seg.total_matched.unwrap_or(seg.result.len() as u64);
        lines.push(format!("  matched users: {matched}"));
        for user in &seg.result {
            lines.push(format!("    {} <{}> score {}", user.name, user.email, user.score));
        }
    }
    if let Some(email) = &a.email_data {
        // Opaque markup; never interpreted here.
        lines.push(format!("  email template: {} bytes of HTML", email.html.len()));
    }
    if let Some(journey) = &a.journey_data {
        lines.push(format!("  journey: {}", journey.plan.trim_end()));
        if let Some(hint) = &journey.schedule_hint {
            lines.push(format!("  scheduling: {hint}"));
        }
    }
    if let Some(analytics) = &a.analytics_data {
        lines.push(format!(
            "  analytics: {} impressions, {} leads, {:.1}% conversion",
            analytics.total_impressions, analytics.total_leads, analytics.overall_conversion_rate
        ));
        for stage in &analytics.funnel_stages {
            lines.push(format!("    {}: {} ({:.1}%)", stage.stage, stage.count, stage.rate));
        }
        if let Some(b) = &analytics.bottleneck {
            lines.push(format!("  bottleneck: {} ({:.1}% drop-off)", b.stage, b.dropoff_rate));
        }
    }
    lines.join("\n")
}

fn render_deployment(s: &DeploymentSnapshot) -> String {
    let mut line = format!(
        "deploy [{}] {:.0}% {}: {} ok ({:.1}%), {} failed ({:.1}%) of {}",
        s.status.label(),
        s.progress_percent,
        s.current_phase,
        s.success_count,
        s.success_rate(),
        s.failed_count,
        s.failure_rate(),
        s.total_recipients
    );
    if s.status.is_terminal() {
        return line;
    }
    if let Some(eta) = &s.estimated_time_remaining {
        line.push_str(&format!(", eta {eta}"));
    }
    line
}
