//! Structured run events and the renderer seam that turns them into output.

use serde::Serialize;

use crate::decision::DecisionRequest;

/// Unified event type for track execution and merging
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderEvent {
    RunStart {
        run_id: String,
        feature: String,
        total_tracks: usize,
        total_rounds: usize,
    },
    RoundStart {
        round: usize,
        tracks: Vec<String>,
    },
    TrackStart {
        track: String,
        resumed_after: Option<String>,
        remaining_tasks: usize,
    },
    TaskAccepted {
        track: String,
        task: String,
        attempt: u32,
        commit: String,
    },
    TaskRejected {
        track: String,
        task: String,
        attempt: u32,
        reason: String,
    },
    TrackComplete {
        track: String,
        final_commit: String,
        executed: usize,
    },
    TrackSkipped {
        track: String,
        reason: String,
    },
    TrackFailed {
        track: String,
        error: String,
        remediation: String,
    },
    RoundEnd {
        round: usize,
        completed: usize,
        failed: usize,
    },
    Integrated {
        round: usize,
        track: String,
        commit: String,
    },
    GateResult {
        round: usize,
        gate: String,
        passed: bool,
        summary: String,
    },
    Suspended {
        request: DecisionRequest,
        remediation: String,
    },
    RunEnd {
        run_id: String,
        completed: usize,
        failed: usize,
        duration_ms: u64,
    },
}

/// Output renderer plugin (controls output format)
pub trait OutputRendererPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn render(&self, event: &RenderEvent);
}

/// Renderer that drops everything; used when no output was requested.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl OutputRendererPlugin for NullRenderer {
    fn name(&self) -> &str {
        "null"
    }

    fn format(&self) -> &str {
        "none"
    }

    fn render(&self, _event: &RenderEvent) {}
}
