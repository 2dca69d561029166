//! Track phases and the rules for moving between them.

use serde::Serialize;

use crate::error::TrackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackPhase {
    Parsed,
    DependenciesSatisfied,
    Resumed,
    Fresh,
    WorktreePrepared,
    TaskLoop,
    /// Suspended until a decision arrives for a dependency timeout.
    WaitingOnDecision,
    Completed,
    Failed,
}

pub struct TrackTransition;

impl TrackTransition {
    pub fn is_valid(from: TrackPhase, to: TrackPhase) -> bool {
        use TrackPhase::*;

        if Self::is_terminal(from) {
            return false;
        }

        matches!(
            (from, to),
            (Parsed, DependenciesSatisfied)
                | (Parsed, WaitingOnDecision)
                | (WaitingOnDecision, Parsed)
                | (WaitingOnDecision, Failed)
                | (DependenciesSatisfied, Resumed)
                | (DependenciesSatisfied, Fresh)
                | (Resumed, WorktreePrepared)
                | (Fresh, WorktreePrepared)
                | (WorktreePrepared, TaskLoop)
                | (WorktreePrepared, Failed)
                | (TaskLoop, Completed)
                | (TaskLoop, Failed)
        )
    }

    pub fn is_terminal(phase: TrackPhase) -> bool {
        matches!(phase, TrackPhase::Completed | TrackPhase::Failed)
    }

    pub fn description(phase: TrackPhase) -> &'static str {
        match phase {
            TrackPhase::Parsed => "packet parsed",
            TrackPhase::DependenciesSatisfied => "dependencies satisfied",
            TrackPhase::Resumed => "resuming from checkpoint",
            TrackPhase::Fresh => "starting fresh",
            TrackPhase::WorktreePrepared => "worktree prepared",
            TrackPhase::TaskLoop => "executing tasks",
            TrackPhase::WaitingOnDecision => "waiting on decision",
            TrackPhase::Completed => "completed",
            TrackPhase::Failed => "failed",
        }
    }
}

/// Current phase of one track run. Every move goes through [`TrackTransition`].
#[derive(Debug)]
pub struct TrackMachine {
    track: String,
    phase: TrackPhase,
}

impl TrackMachine {
    pub fn new(track: impl Into<String>) -> Self {
        Self {
            track: track.into(),
            phase: TrackPhase::Parsed,
        }
    }

    pub fn phase(&self) -> TrackPhase {
        self.phase
    }

    pub fn advance(&mut self, to: TrackPhase) -> Result<(), TrackError> {
        if !TrackTransition::is_valid(self.phase, to) {
            return Err(TrackError::InvalidTransition {
                track: self.track.clone(),
                from: self.phase,
                to,
            });
        }
        tracing::debug!(
            track = %self.track,
            from = ?self.phase,
            to = ?to,
            "{}",
            TrackTransition::description(to)
        );
        self.phase = to;
        Ok(())
    }

    /// Move to `Failed` when that is legal from here and report whether it
    /// happened. Failures raised before the worktree is prepared leave the
    /// phase untouched.
    pub fn fail(&mut self) -> bool {
        if !TrackTransition::is_valid(self.phase, TrackPhase::Failed) {
            return false;
        }
        tracing::debug!(track = %self.track, from = ?self.phase, "track failed");
        self.phase = TrackPhase::Failed;
        true
    }
}
