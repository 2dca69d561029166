use thiserror::Error;

use super::code::ExitCode;
use super::manifest::ScheduleError;
use super::store::StoreError;

/// Round-local merge failures. They block advancement past the failing round
/// but never touch rounds that already passed their gate.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("tracks not complete yet: {}", tracks.join(", "))]
    IncompleteTracks { tracks: Vec<String> },

    #[error("round {round}: merging track '{track}' conflicts in {}", paths.join(", "))]
    MergeConflict {
        round: usize,
        track: String,
        paths: Vec<String>,
    },

    #[error("round {round}: gate '{gate}' failed: {summary}")]
    RoundTestFailure {
        round: usize,
        gate: String,
        summary: String,
    },

    #[error("a previous merge is suspended: {0}")]
    PendingEscalation(String),

    #[error("round {round}: {context}: {source}")]
    Collaborator {
        round: usize,
        context: &'static str,
        source: anyhow::Error,
    },

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MergeError {
    pub fn round(&self) -> Option<usize> {
        match self {
            Self::MergeConflict { round, .. }
            | Self::RoundTestFailure { round, .. }
            | Self::Collaborator { round, .. } => Some(*round),
            _ => None,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::IncompleteTracks { .. } => ExitCode::ValidationError,
            Self::MergeConflict { .. } => ExitCode::MergeConflict,
            Self::RoundTestFailure { .. } => ExitCode::GateFailure,
            Self::PendingEscalation(_) => ExitCode::ValidationError,
            Self::Schedule(e) => e.exit_code(),
            Self::Collaborator { .. } | Self::Store(_) => ExitCode::GeneralError,
        }
    }

    pub fn remediation(&self) -> String {
        match self {
            Self::IncompleteTracks { .. } => {
                "run `packetflow run-all <manifest-dir>` until every track completes".to_string()
            }
            Self::MergeConflict { track, .. } => format!(
                "resolve the conflicts of '{track}' in the base worktree, then run `packetflow merge <manifest-dir> --continue`"
            ),
            Self::RoundTestFailure { gate, .. } => format!(
                "fix the failing gate '{gate}' on the base branch, then run `packetflow merge <manifest-dir> --continue`"
            ),
            Self::PendingEscalation(_) => {
                "run `packetflow merge <manifest-dir> --continue`".to_string()
            }
            Self::Schedule(e) => e.remediation(),
            Self::Collaborator { .. } | Self::Store(_) => {
                "fix the underlying problem, then run `packetflow merge <manifest-dir> --continue`"
                    .to_string()
            }
        }
    }
}
