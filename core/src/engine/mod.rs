//! Execution engine for `run-all`: every pending track, round by round.
//!
//! Rounds run strictly one after another. Tracks inside a round run
//! concurrently up to `max_parallel`. A round with a failed track still lets
//! its siblings finish, but no later round starts.

mod parallel;
mod progress;

use std::sync::Arc;
use std::time::Instant;

use crate::completion::CompletionRegistry;
use crate::error::{RunError, TrackError};
use crate::render::{OutputRendererPlugin, RenderEvent};
use crate::scheduler::{self, Round};
use crate::track::{TrackExecutor, TrackReport};

pub use parallel::run_bounded;
pub use progress::ProgressMonitor;

#[derive(Debug)]
pub struct TrackFailure {
    pub track_id: String,
    pub round: usize,
    pub error: TrackError,
}

#[derive(Debug)]
pub struct RunSummary {
    pub run_id: String,
    /// Pending rounds computed at the start of the run.
    pub rounds: Vec<Round>,
    pub completed: Vec<TrackReport>,
    pub failed: Vec<TrackFailure>,
    /// 1-based round after which the run stopped because of failures.
    pub halted_after: Option<usize>,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct ExecutionEngine {
    executor: TrackExecutor,
    registry: CompletionRegistry,
    max_parallel: usize,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    progress_bar: bool,
}

impl ExecutionEngine {
    pub fn new(executor: TrackExecutor, registry: CompletionRegistry) -> Self {
        Self {
            executor,
            registry,
            max_parallel: 1,
            renderer: None,
            progress_bar: false,
        }
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_progress_bar(mut self, enabled: bool) -> Self {
        self.progress_bar = enabled;
        self
    }

    pub async fn run_all(&self) -> Result<RunSummary, RunError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let manifest = self.executor.manifest();

        let done = self.registry.completed_ids()?;
        let rounds = scheduler::pending_rounds(manifest, &done)?;
        let total_tracks: usize = rounds.iter().map(|r| r.tracks.len()).sum();

        tracing::info!(
            run_id = %run_id,
            feature = %manifest.feature_id,
            pending = total_tracks,
            already_complete = done.len(),
            rounds = rounds.len(),
            "starting run"
        );
        self.emit(RenderEvent::RunStart {
            run_id: run_id.clone(),
            feature: manifest.feature_id.clone(),
            total_tracks,
            total_rounds: rounds.len(),
        });

        let mut progress = ProgressMonitor::new(total_tracks, self.progress_bar);

        let mut completed = Vec::new();
        let mut failed = Vec::new();
        let mut halted_after = None;

        for round in &rounds {
            let number = round.number();
            tracing::info!(round = number, tracks = ?round.tracks, "starting round");
            self.emit(RenderEvent::RoundStart {
                round: number,
                tracks: round.tracks.clone(),
            });
            progress.update_round(number, rounds.len());
            for id in &round.tracks {
                progress.add_track(id);
            }

            let results = run_bounded(&round.tracks, self.max_parallel, {
                let executor = self.executor.clone();
                move |id: String| {
                    let executor = executor.clone();
                    async move { executor.run(&id).await }
                }
            })
            .await;

            let before = failed.len();
            for (id, result) in results {
                progress.complete_track(&id, result.is_ok());
                match result {
                    Ok(report) => completed.push(report),
                    Err(error) => failed.push(TrackFailure {
                        track_id: id,
                        round: number,
                        error,
                    }),
                }
            }
            let round_failed = failed.len() - before;

            self.emit(RenderEvent::RoundEnd {
                round: number,
                completed: round.tracks.len() - round_failed,
                failed: round_failed,
            });

            if round_failed > 0 {
                tracing::warn!(round = number, failed = round_failed, "round failed, not starting later rounds");
                halted_after = Some(number);
                break;
            }
        }

        progress.finish(failed.is_empty());

        let duration_ms = start.elapsed().as_millis() as u64;
        self.emit(RenderEvent::RunEnd {
            run_id: run_id.clone(),
            completed: completed.len(),
            failed: failed.len(),
            duration_ms,
        });

        Ok(RunSummary {
            run_id,
            rounds,
            completed,
            failed,
            halted_after,
            duration_ms,
        })
    }

    fn emit(&self, event: RenderEvent) {
        if let Some(r) = &self.renderer {
            r.render(&event);
        }
    }
}
