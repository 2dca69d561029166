use packetflow_core::api::{DecisionRequest, OutputRendererPlugin, RenderEvent};

pub struct TextRendererPlugin {
    ascii_only: bool,
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn mark(&self, ok: bool) -> &'static str {
        match (ok, self.ascii_only) {
            (true, true) => "OK",
            (true, false) => "✓",
            (false, true) => "FAIL",
            (false, false) => "✗",
        }
    }

    fn format_event(&self, event: &RenderEvent) -> String {
        match event {
            RenderEvent::RunStart {
                run_id,
                feature,
                total_tracks,
                total_rounds,
            } => format!(
                "RUN START {} feature {} (tracks: {}, rounds: {})",
                run_id, feature, total_tracks, total_rounds
            ),
            RenderEvent::RoundStart { round, tracks } => {
                format!("ROUND {} START: {}", round, tracks.join(", "))
            }
            RenderEvent::TrackStart {
                track,
                resumed_after,
                remaining_tasks,
            } => match resumed_after {
                Some(task) => format!(
                    "TRACK {} resumed after task {} ({} remaining)",
                    track, task, remaining_tasks
                ),
                None => format!("TRACK {} started ({} tasks)", track, remaining_tasks),
            },
            RenderEvent::TaskAccepted {
                track,
                task,
                attempt,
                commit,
            } => format!(
                "  {} {}/{} accepted (attempt {}, commit {})",
                self.mark(true),
                track,
                task,
                attempt,
                short(commit)
            ),
            RenderEvent::TaskRejected {
                track,
                task,
                attempt,
                reason,
            } => format!(
                "  {} {}/{} rejected (attempt {}): {}",
                self.mark(false),
                track,
                task,
                attempt,
                reason
            ),
            RenderEvent::TrackComplete {
                track,
                final_commit,
                executed,
            } => format!(
                "TRACK {} complete ({} tasks run, final {})",
                track,
                executed,
                short(final_commit)
            ),
            RenderEvent::TrackSkipped { track, reason } => {
                format!("TRACK {} skipped: {}", track, reason)
            }
            RenderEvent::TrackFailed {
                track,
                error,
                remediation,
            } => format!("TRACK {} FAILED: {}\n  next: {}", track, error, remediation),
            RenderEvent::RoundEnd {
                round,
                completed,
                failed,
            } => format!(
                "ROUND {} END (completed {}, failed {})",
                round, completed, failed
            ),
            RenderEvent::Integrated {
                round,
                track,
                commit,
            } => format!(
                "  {} round {}: integrated {} ({})",
                self.mark(true),
                round,
                track,
                short(commit)
            ),
            RenderEvent::GateResult {
                round,
                gate,
                passed,
                summary,
            } => format!(
                "  {} round {}: gate {} {}",
                self.mark(*passed),
                round,
                gate,
                summary
            ),
            RenderEvent::Suspended {
                request,
                remediation,
            } => format!(
                "SUSPENDED ({}): {}\n  next: {}",
                request.kind(),
                describe(request),
                remediation
            ),
            RenderEvent::RunEnd {
                run_id,
                completed,
                failed,
                duration_ms,
            } => format!(
                "RUN END {} (completed {}, failed {}, duration {}ms)",
                run_id, completed, failed, duration_ms
            ),
        }
    }
}

fn short(commit: &str) -> &str {
    commit.get(..10).unwrap_or(commit)
}

fn describe(request: &DecisionRequest) -> String {
    match request {
        DecisionRequest::DependencyTimeout {
            track,
            missing,
            waited_secs,
            ..
        } => format!(
            "track {} still waiting on {} after {}s",
            track,
            missing.join(", "),
            waited_secs
        ),
        DecisionRequest::MergeConflict { round, track, paths } => format!(
            "round {} conflict merging {} in {}",
            round,
            track,
            paths.join(", ")
        ),
        DecisionRequest::RoundTestFailure {
            round,
            gate,
            summary,
            ..
        } => format!("round {} gate {} failed: {}", round, gate, summary),
    }
}

impl OutputRendererPlugin for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RenderEvent) {
        println!("{}", self.format_event(event));
    }
}
