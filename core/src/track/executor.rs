use std::path::Path;
use std::sync::Arc;

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::completion::{CompletionMarker, CompletionRegistry, WaitOutcome};
use crate::decision::{decide_checked, Decision, DecisionHandler, DecisionRequest, DeferAll};
use crate::error::{ManifestError, TrackError};
use crate::knowledge::{KnowledgeBase, KnowledgeNote};
use crate::manifest::{load_packet, Manifest, Task, Track};
use crate::render::{OutputRendererPlugin, RenderEvent};

use super::state::{TrackMachine, TrackPhase};
use super::traits::{RetryStrategyPlugin, TaskExecutor, Workspace};
use super::types::{
    ResumePolicy, TaskContext, TaskEvidence, TaskOutcome, TrackOptions, TrackReport, TrackStatus,
};

/// Drives one track from parsed packet to completion marker.
#[derive(Clone)]
pub struct TrackExecutor {
    manifest: Arc<Manifest>,
    checkpoints: CheckpointStore,
    registry: CompletionRegistry,
    tasks: Arc<dyn TaskExecutor>,
    workspace: Arc<dyn Workspace>,
    decisions: Arc<dyn DecisionHandler>,
    knowledge: Option<Arc<dyn KnowledgeBase>>,
    retry: Option<Arc<dyn RetryStrategyPlugin>>,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    options: TrackOptions,
}

impl TrackExecutor {
    pub fn new(
        manifest: Arc<Manifest>,
        checkpoints: CheckpointStore,
        registry: CompletionRegistry,
        tasks: Arc<dyn TaskExecutor>,
        workspace: Arc<dyn Workspace>,
    ) -> Self {
        Self {
            manifest,
            checkpoints,
            registry,
            tasks,
            workspace,
            decisions: Arc::new(DeferAll),
            knowledge: None,
            retry: None,
            renderer: None,
            options: TrackOptions::default(),
        }
    }

    pub fn with_decisions(mut self, decisions: Arc<dyn DecisionHandler>) -> Self {
        self.decisions = decisions;
        self
    }

    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeBase>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    pub fn with_retry_strategy(mut self, retry: Arc<dyn RetryStrategyPlugin>) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_options(mut self, options: TrackOptions) -> Self {
        self.registry = self.registry.with_poll_interval(options.poll_interval);
        self.options = options;
        self
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Run `track_id` to completion. Failures leave the checkpoint of the last
    /// accepted task in place so the track can be resumed.
    pub async fn run(&self, track_id: &str) -> Result<TrackReport, TrackError> {
        let track = self.manifest.track(track_id).ok_or_else(|| {
            ManifestError::MalformedManifest(format!("unknown track '{track_id}'"))
        })?;

        if self.registry.is_complete(track_id)? {
            tracing::info!(track = %track_id, "already complete, nothing to do");
            self.emit(RenderEvent::TrackSkipped {
                track: track_id.to_string(),
                reason: "already complete".to_string(),
            });
            let final_commit = self
                .registry
                .marker(track_id)?
                .map(|m| m.final_commit_ref);
            return Ok(TrackReport {
                track_id: track_id.to_string(),
                status: TrackStatus::AlreadyComplete,
                executed: Vec::new(),
                skipped: Vec::new(),
                final_commit,
            });
        }

        let tasks = load_packet(&self.manifest, track)?;
        let mut machine = TrackMachine::new(track_id);

        let result = self.drive(track, &tasks, &mut machine).await;
        if let Err(err) = &result {
            let failed_in = machine.phase();
            if machine.fail() {
                tracing::error!(track = %track_id, phase = ?failed_in, error = %err, "track failed");
            } else {
                tracing::error!(
                    track = %track_id,
                    phase = ?failed_in,
                    error = %err,
                    "track failed before its worktree was prepared"
                );
            }
            self.emit(RenderEvent::TrackFailed {
                track: track_id.to_string(),
                error: err.to_string(),
                remediation: err.remediation(),
            });
        }
        result
    }

    async fn drive(
        &self,
        track: &Track,
        tasks: &[Task],
        machine: &mut TrackMachine,
    ) -> Result<TrackReport, TrackError> {
        self.await_dependencies(track, machine).await?;

        let (start, resumed_commit) = match self.checkpoints.load(&track.id)? {
            Some(cp) => {
                if self.options.resume == ResumePolicy::Refuse {
                    return Err(TrackError::CheckpointPresent {
                        track: track.id.clone(),
                        last_completed: cp.last_completed_task_id,
                    });
                }
                let start = resume_index(&track.id, tasks, &cp)?;
                machine.advance(TrackPhase::Resumed)?;
                tracing::info!(
                    track = %track.id,
                    last = %cp.last_completed_task_id,
                    skipped = start,
                    "resuming from checkpoint"
                );
                (start, Some(cp.commit_ref))
            }
            None => {
                machine.advance(TrackPhase::Fresh)?;
                (0, None)
            }
        };

        machine.advance(TrackPhase::WorktreePrepared)?;
        let worktree = self.manifest.worktree_path(track);
        self.check_branch(track, &worktree).await?;

        self.emit(RenderEvent::TrackStart {
            track: track.id.clone(),
            resumed_after: start
                .checked_sub(1)
                .and_then(|i| tasks.get(i))
                .map(|t| t.id.clone()),
            remaining_tasks: tasks.len() - start,
        });

        machine.advance(TrackPhase::TaskLoop)?;
        let mut executed = Vec::new();
        let mut last_commit = resumed_commit;
        for (index, task) in tasks.iter().enumerate().skip(start) {
            let evidence = self.run_task(track, &worktree, task).await?;
            let next = tasks.get(index + 1).map(|t| t.id.clone());
            self.checkpoints.save(&Checkpoint::new(
                &track.id,
                &task.id,
                &evidence.commit_ref,
                next,
            ))?;
            executed.push(task.id.clone());
            last_commit = Some(evidence.commit_ref);
        }

        let final_commit = match last_commit {
            Some(c) => c,
            None => self
                .workspace
                .head_commit(&worktree)
                .await
                .map_err(|source| TrackError::Collaborator {
                    track: track.id.clone(),
                    context: "reading head commit",
                    source,
                })?,
        };

        self.registry
            .mark_complete(&track.id, &CompletionMarker::new(&track.id, &final_commit))?;
        machine.advance(TrackPhase::Completed)?;

        tracing::info!(track = %track.id, executed = executed.len(), commit = %final_commit, "track complete");
        self.emit(RenderEvent::TrackComplete {
            track: track.id.clone(),
            final_commit: final_commit.clone(),
            executed: executed.len(),
        });

        Ok(TrackReport {
            track_id: track.id.clone(),
            status: TrackStatus::Completed,
            executed,
            skipped: tasks[..start].iter().map(|t| t.id.clone()).collect(),
            final_commit: Some(final_commit),
        })
    }

    async fn await_dependencies(
        &self,
        track: &Track,
        machine: &mut TrackMachine,
    ) -> Result<(), TrackError> {
        let deps: Vec<String> = track.depends_on.iter().cloned().collect();
        let window = self.options.dependency_timeout;
        let mut extensions = 0u32;

        loop {
            match self.registry.wait_for(&deps, window).await? {
                WaitOutcome::Satisfied => {
                    machine.advance(TrackPhase::DependenciesSatisfied)?;
                    return Ok(());
                }
                WaitOutcome::TimedOut { missing } => {
                    machine.advance(TrackPhase::WaitingOnDecision)?;
                    let waited = window * (extensions + 1);
                    tracing::warn!(track = %track.id, missing = ?missing, ?waited, "dependency wait timed out");

                    let request = DecisionRequest::DependencyTimeout {
                        track: track.id.clone(),
                        missing: missing.clone(),
                        waited_secs: waited.as_secs(),
                        extensions,
                    };
                    match decide_checked(self.decisions.as_ref(), &request).await {
                        Some(Decision::Wait) => {
                            extensions += 1;
                            machine.advance(TrackPhase::Parsed)?;
                        }
                        _ => {
                            let err = TrackError::DependencyTimeout {
                                track: track.id.clone(),
                                missing,
                                waited,
                            };
                            self.emit(RenderEvent::Suspended {
                                request,
                                remediation: err.remediation(),
                            });
                            return Err(err);
                        }
                    }
                }
            }
        }
    }

    async fn check_branch(&self, track: &Track, worktree: &Path) -> Result<(), TrackError> {
        let actual = self
            .workspace
            .current_branch(worktree)
            .await
            .map_err(|source| TrackError::Collaborator {
                track: track.id.clone(),
                context: "reading worktree branch",
                source,
            })?;

        if actual != track.branch_name {
            return Err(TrackError::WorktreeBranchMismatch {
                track: track.id.clone(),
                worktree: worktree.to_path_buf(),
                expected: track.branch_name.clone(),
                actual,
            });
        }
        Ok(())
    }

    async fn run_task(
        &self,
        track: &Track,
        worktree: &Path,
        task: &Task,
    ) -> Result<TaskEvidence, TrackError> {
        let max_attempts = self
            .retry
            .as_ref()
            .map(|r| r.max_attempts())
            .unwrap_or(self.options.max_attempts)
            .max(1);
        let hints = self.recall(track, task).await;

        let mut attempt = 1u32;
        let mut previous_rejection = None;
        loop {
            let ctx = TaskContext {
                feature_id: self.manifest.feature_id.clone(),
                track_id: track.id.clone(),
                worktree: worktree.to_path_buf(),
                branch: track.branch_name.clone(),
                attempt,
                hints: hints.clone(),
                previous_rejection: previous_rejection.clone(),
            };
            tracing::info!(track = %track.id, task = %task.id, attempt, "attempting task");

            let reason = match self.tasks.attempt(task, &ctx).await {
                Ok(TaskOutcome::Accepted(evidence)) if evidence.red_observed => {
                    self.record(track, task, true, evidence.notes.as_deref().unwrap_or("accepted"))
                        .await;
                    self.emit(RenderEvent::TaskAccepted {
                        track: track.id.clone(),
                        task: task.id.clone(),
                        attempt,
                        commit: evidence.commit_ref.clone(),
                    });
                    return Ok(evidence);
                }
                Ok(TaskOutcome::Accepted(_)) => {
                    "no failing verification was observed before the change".to_string()
                }
                Ok(TaskOutcome::Rejected { reason }) => reason,
                Err(e) => format!("executor error: {e:#}"),
            };

            tracing::warn!(track = %track.id, task = %task.id, attempt, reason = %reason, "task attempt rejected");
            self.record(track, task, false, &reason).await;
            self.emit(RenderEvent::TaskRejected {
                track: track.id.clone(),
                task: task.id.clone(),
                attempt,
                reason: reason.clone(),
            });

            let retry = match &self.retry {
                Some(r) => r.should_retry(attempt, &reason),
                None => attempt < max_attempts,
            };
            if !retry {
                return Err(TrackError::TaskAcceptanceFailure {
                    track: track.id.clone(),
                    task: task.id.clone(),
                    attempts: attempt,
                    reason,
                });
            }

            if let Some(delay) = self
                .retry
                .as_ref()
                .and_then(|r| r.next_delay(attempt, &reason))
            {
                tracing::debug!(track = %track.id, task = %task.id, ?delay, "waiting before retry");
                tokio::time::sleep(delay).await;
            }
            previous_rejection = Some(reason);
            attempt += 1;
        }
    }

    async fn recall(&self, track: &Track, task: &Task) -> Vec<String> {
        let Some(kb) = &self.knowledge else {
            return Vec::new();
        };
        match kb.recall(&track.id, task).await {
            Ok(hints) => hints,
            Err(e) => {
                tracing::warn!(track = %track.id, task = %task.id, error = %e, "knowledge recall failed");
                Vec::new()
            }
        }
    }

    async fn record(&self, track: &Track, task: &Task, accepted: bool, note: &str) {
        let Some(kb) = &self.knowledge else {
            return;
        };
        let note = KnowledgeNote::new(&track.id, &task.id, accepted, note);
        if let Err(e) = kb.record(&note).await {
            tracing::warn!(track = %track.id, task = %task.id, error = %e, "knowledge record failed");
        }
    }

    fn emit(&self, event: RenderEvent) {
        if let Some(r) = &self.renderer {
            r.render(&event);
        }
    }
}

/// Index of the first task still to run after `checkpoint`.
pub fn resume_index(
    track_id: &str,
    tasks: &[Task],
    checkpoint: &Checkpoint,
) -> Result<usize, TrackError> {
    let mismatch = |reason: String| TrackError::CheckpointMismatch {
        track: track_id.to_string(),
        reason,
    };

    if checkpoint.track_id != track_id {
        return Err(mismatch(format!(
            "checkpoint belongs to track '{}'",
            checkpoint.track_id
        )));
    }

    let last = tasks
        .iter()
        .position(|t| t.id == checkpoint.last_completed_task_id)
        .ok_or_else(|| {
            mismatch(format!(
                "last completed task '{}' is not in the packet",
                checkpoint.last_completed_task_id
            ))
        })?;

    let expected_next = tasks.get(last + 1).map(|t| t.id.as_str());
    if checkpoint.next_task_id.as_deref() != expected_next {
        return Err(mismatch(format!(
            "checkpoint expects next task {:?}, packet has {:?}",
            checkpoint.next_task_id, expected_next
        )));
    }

    Ok(last + 1)
}
