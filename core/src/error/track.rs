use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::code::ExitCode;
use super::manifest::ManifestError;
use super::store::StoreError;
use crate::track::TrackPhase;

/// Track-local failures. Any of these stops only the track that raised it.
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("track '{track}': dependencies {missing:?} not complete after {waited:?}")]
    DependencyTimeout {
        track: String,
        missing: Vec<String>,
        waited: Duration,
    },

    #[error(
        "track '{track}': worktree {} is on branch '{actual}', expected '{expected}'",
        worktree.display()
    )]
    WorktreeBranchMismatch {
        track: String,
        worktree: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("track '{track}': task '{task}' not accepted after {attempts} attempt(s): {reason}")]
    TaskAcceptanceFailure {
        track: String,
        task: String,
        attempts: u32,
        reason: String,
    },

    #[error("track '{track}': checkpoint exists (last completed task '{last_completed}')")]
    CheckpointPresent {
        track: String,
        last_completed: String,
    },

    #[error("track '{track}': checkpoint does not match packet: {reason}")]
    CheckpointMismatch { track: String, reason: String },

    #[error("track '{track}': invalid transition {from:?} -> {to:?}")]
    InvalidTransition {
        track: String,
        from: TrackPhase,
        to: TrackPhase,
    },

    #[error("track '{track}': {context}: {source}")]
    Collaborator {
        track: String,
        context: &'static str,
        source: anyhow::Error,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TrackError {
    pub fn track_id(&self) -> Option<&str> {
        match self {
            Self::DependencyTimeout { track, .. }
            | Self::WorktreeBranchMismatch { track, .. }
            | Self::TaskAcceptanceFailure { track, .. }
            | Self::CheckpointPresent { track, .. }
            | Self::CheckpointMismatch { track, .. }
            | Self::InvalidTransition { track, .. }
            | Self::Collaborator { track, .. } => Some(track),
            Self::Manifest(ManifestError::MalformedPacket { track, .. }) => Some(track),
            Self::Manifest(_) | Self::Store(_) => None,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::DependencyTimeout { .. } => ExitCode::DependencyTimeout,
            Self::WorktreeBranchMismatch { .. } | Self::TaskAcceptanceFailure { .. } => {
                ExitCode::TrackFailure
            }
            Self::CheckpointPresent { .. } | Self::CheckpointMismatch { .. } => {
                ExitCode::ValidationError
            }
            Self::Manifest(e) => e.exit_code(),
            Self::InvalidTransition { .. } | Self::Collaborator { .. } | Self::Store(_) => {
                ExitCode::GeneralError
            }
        }
    }

    /// The entry point the operator should use next.
    pub fn remediation(&self) -> String {
        match self {
            Self::DependencyTimeout { missing, .. } => format!(
                "finish {} first, or rerun with --on-dependency-timeout wait",
                missing.join(", ")
            ),
            Self::WorktreeBranchMismatch {
                worktree, expected, ..
            } => format!(
                "check out '{expected}' in {} yourself, then rerun with --resume",
                worktree.display()
            ),
            Self::TaskAcceptanceFailure { task, .. } => format!(
                "fix task '{task}' by hand or amend the packet, then rerun with --resume"
            ),
            Self::CheckpointPresent { .. } => {
                "rerun with --resume to continue from the checkpoint".to_string()
            }
            Self::CheckpointMismatch { track, .. } => format!(
                "restore the original packet, or delete the checkpoint of '{track}' to start over"
            ),
            Self::Manifest(e) => e.remediation(),
            Self::InvalidTransition { .. } | Self::Collaborator { .. } | Self::Store(_) => {
                "rerun with --resume once the underlying problem is fixed".to_string()
            }
        }
    }
}
