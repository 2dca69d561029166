use std::sync::Arc;

use serde::Serialize;

use crate::completion::CompletionRegistry;
use crate::decision::{decide_checked, Decision, DecisionHandler, DecisionRequest, DeferAll};
use crate::error::MergeError;
use crate::manifest::{Manifest, Track};
use crate::render::{OutputRendererPlugin, RenderEvent};
use crate::scheduler::{self, Round};

use super::state::{MergeState, MergeStateStore, PendingEscalation};
use super::traits::{GateRunner, IntegrationOutcome, Integrator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Refuse to run over a suspended merge.
    Start,
    /// Pick up a suspended merge where it stopped.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub total_rounds: usize,
    /// Rounds whose gates passed during this run.
    pub rounds_merged: usize,
    /// Tracks integrated during this run, in merge order.
    pub integrated: Vec<String>,
}

/// Integrates completed tracks round by round. A round's gates must pass
/// before anything from the next round is touched.
pub struct MergeOrchestrator {
    manifest: Arc<Manifest>,
    registry: CompletionRegistry,
    store: MergeStateStore,
    integrator: Arc<dyn Integrator>,
    gates: Arc<dyn GateRunner>,
    decisions: Arc<dyn DecisionHandler>,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    max_gate_retries: u32,
}

impl MergeOrchestrator {
    pub fn new(
        manifest: Arc<Manifest>,
        registry: CompletionRegistry,
        store: MergeStateStore,
        integrator: Arc<dyn Integrator>,
        gates: Arc<dyn GateRunner>,
    ) -> Self {
        Self {
            manifest,
            registry,
            store,
            integrator,
            gates,
            decisions: Arc::new(DeferAll),
            renderer: None,
            max_gate_retries: 0,
        }
    }

    pub fn with_decisions(mut self, decisions: Arc<dyn DecisionHandler>) -> Self {
        self.decisions = decisions;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_max_gate_retries(mut self, retries: u32) -> Self {
        self.max_gate_retries = retries;
        self
    }

    pub async fn run(&self, mode: MergeMode) -> Result<MergeReport, MergeError> {
        let ids: Vec<String> = self.manifest.tracks.iter().map(|t| t.id.clone()).collect();
        let missing = self.registry.missing(&ids)?;
        if !missing.is_empty() {
            return Err(MergeError::IncompleteTracks { tracks: missing });
        }

        let rounds = scheduler::order(&self.manifest.tracks)?;
        let mut state = match self.store.load()? {
            Some(s) if s.feature_id == self.manifest.feature_id => s,
            Some(s) => {
                tracing::warn!(
                    found = %s.feature_id,
                    expected = %self.manifest.feature_id,
                    "merge state belongs to another feature, starting over"
                );
                MergeState::new(&self.manifest.feature_id)
            }
            None => MergeState::new(&self.manifest.feature_id),
        };

        let mut report = MergeReport {
            total_rounds: rounds.len(),
            rounds_merged: 0,
            integrated: Vec::new(),
        };

        match (mode, state.pending.clone()) {
            (MergeMode::Start, Some(pending)) => {
                return Err(MergeError::PendingEscalation(pending.describe()));
            }
            (MergeMode::Continue, Some(PendingEscalation::Conflict { round, track, .. })) => {
                tracing::info!(round, track = %track, "concluding resolved merge");
                let track = self.track(&track, round)?;
                let outcome = self
                    .integrator
                    .conclude(track, self.manifest.merge_strategy)
                    .await
                    .map_err(|source| MergeError::Collaborator {
                        round,
                        context: "concluding merge",
                        source,
                    })?;
                state.pending = None;
                self.record_outcome(round, track, outcome, &mut state, &mut report)
                    .await?;
            }
            (MergeMode::Continue, Some(PendingEscalation::GateFailure { round, gate, .. })) => {
                tracing::info!(round, gate = %gate, "re-running gates after fix");
                state.pending = None;
            }
            (MergeMode::Continue, None) => {
                tracing::info!("no suspended merge, continuing from saved progress");
            }
            (MergeMode::Start, None) => {}
        }

        for round in rounds.iter().skip(state.rounds_passed) {
            self.merge_round(round, &mut state, &mut report).await?;
        }

        tracing::info!(
            rounds = report.rounds_merged,
            integrated = report.integrated.len(),
            "merge complete"
        );
        Ok(report)
    }

    async fn merge_round(
        &self,
        round: &Round,
        state: &mut MergeState,
        report: &mut MergeReport,
    ) -> Result<(), MergeError> {
        let number = round.number();
        self.emit(RenderEvent::RoundStart {
            round: number,
            tracks: round.tracks.clone(),
        });

        for id in &round.tracks {
            if state.is_integrated(id) {
                continue;
            }
            let track = self.track(id, number)?;
            tracing::info!(round = number, track = %id, strategy = self.manifest.merge_strategy.as_str(), "integrating");
            let outcome = self
                .integrator
                .integrate(track, self.manifest.merge_strategy)
                .await
                .map_err(|source| MergeError::Collaborator {
                    round: number,
                    context: "integrating track",
                    source,
                })?;
            self.record_outcome(number, track, outcome, state, report)
                .await?;
        }

        self.run_gates(number, state).await?;

        state.rounds_passed += 1;
        self.store.save(state)?;
        report.rounds_merged += 1;
        self.emit(RenderEvent::RoundEnd {
            round: number,
            completed: round.tracks.len(),
            failed: 0,
        });
        Ok(())
    }

    /// Persist a clean integration, or hand a conflict to the resolver.
    async fn record_outcome(
        &self,
        round: usize,
        track: &Track,
        outcome: IntegrationOutcome,
        state: &mut MergeState,
        report: &mut MergeReport,
    ) -> Result<(), MergeError> {
        let mut outcome = outcome;
        loop {
            match outcome {
                IntegrationOutcome::Clean { commit } => {
                    state.integrated.push(track.id.clone());
                    self.store.save(state)?;
                    report.integrated.push(track.id.clone());
                    self.emit(RenderEvent::Integrated {
                        round,
                        track: track.id.clone(),
                        commit,
                    });
                    return Ok(());
                }
                IntegrationOutcome::Conflict { paths } => {
                    tracing::warn!(round, track = %track.id, paths = ?paths, "merge conflict");
                    let request = DecisionRequest::MergeConflict {
                        round,
                        track: track.id.clone(),
                        paths: paths.clone(),
                    };
                    if decide_checked(self.decisions.as_ref(), &request).await
                        != Some(Decision::Resolved)
                    {
                        let err = MergeError::MergeConflict {
                            round,
                            track: track.id.clone(),
                            paths: paths.clone(),
                        };
                        self.suspend(
                            state,
                            PendingEscalation::Conflict {
                                round,
                                track: track.id.clone(),
                                paths,
                            },
                            request,
                            &err,
                        )?;
                        return Err(err);
                    }
                    outcome = self
                        .integrator
                        .conclude(track, self.manifest.merge_strategy)
                        .await
                        .map_err(|source| MergeError::Collaborator {
                            round,
                            context: "concluding merge",
                            source,
                        })?;
                }
            }
        }
    }

    async fn run_gates(&self, round: usize, state: &mut MergeState) -> Result<(), MergeError> {
        let mut attempt = 1u32;
        loop {
            let Some((gate, summary)) = self.first_failing_gate(round).await? else {
                return Ok(());
            };

            let request = DecisionRequest::RoundTestFailure {
                round,
                gate: gate.clone(),
                summary: summary.clone(),
                attempt,
            };
            let decision = decide_checked(self.decisions.as_ref(), &request).await;
            if decision == Some(Decision::Retry) && attempt <= self.max_gate_retries {
                tracing::info!(round, gate = %gate, attempt, "retrying gates");
                attempt += 1;
                continue;
            }

            let err = MergeError::RoundTestFailure {
                round,
                gate: gate.clone(),
                summary: summary.clone(),
            };
            self.suspend(
                state,
                PendingEscalation::GateFailure {
                    round,
                    gate,
                    summary,
                },
                request,
                &err,
            )?;
            return Err(err);
        }
    }

    /// Run every gate in order, stopping at the first failure.
    async fn first_failing_gate(&self, round: usize) -> Result<Option<(String, String)>, MergeError> {
        for gate in &self.manifest.post_merge_qa {
            let report = self
                .gates
                .run_gate(gate)
                .await
                .map_err(|source| MergeError::Collaborator {
                    round,
                    context: "running gate",
                    source,
                })?;
            tracing::info!(round, gate = %gate, passed = report.passed, "gate finished");
            self.emit(RenderEvent::GateResult {
                round,
                gate: gate.clone(),
                passed: report.passed,
                summary: report.summary.clone(),
            });
            if !report.passed {
                return Ok(Some((gate.clone(), report.summary)));
            }
        }
        Ok(None)
    }

    fn suspend(
        &self,
        state: &mut MergeState,
        pending: PendingEscalation,
        request: DecisionRequest,
        err: &MergeError,
    ) -> Result<(), MergeError> {
        tracing::warn!(escalation = %pending.describe(), "merge suspended");
        state.pending = Some(pending);
        self.store.save(state)?;
        self.emit(RenderEvent::Suspended {
            request,
            remediation: err.remediation(),
        });
        Ok(())
    }

    fn track(&self, id: &str, round: usize) -> Result<&Track, MergeError> {
        self.manifest.track(id).ok_or_else(|| MergeError::Collaborator {
            round,
            context: "looking up track",
            source: anyhow::anyhow!("track '{id}' is not in the manifest"),
        })
    }

    fn emit(&self, event: RenderEvent) {
        if let Some(r) = &self.renderer {
            r.render(&event);
        }
    }
}
