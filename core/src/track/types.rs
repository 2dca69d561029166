use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::completion::DEFAULT_POLL_INTERVAL;

/// Everything a task executor gets to know about where it runs.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub feature_id: String,
    pub track_id: String,
    pub worktree: PathBuf,
    pub branch: String,
    /// 1-based attempt number for this task.
    pub attempt: u32,
    /// Notes recalled from the knowledge collaborator.
    pub hints: Vec<String>,
    /// Reason the previous attempt was rejected, if any.
    pub previous_rejection: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEvidence {
    /// The verification was seen failing before the change was made.
    pub red_observed: bool,
    /// Commit holding the accepted change.
    pub commit_ref: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Accepted(TaskEvidence),
    Rejected { reason: String },
}

/// What to do when a checkpoint already exists for the track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePolicy {
    /// Continue after the last completed task.
    Resume,
    /// Refuse to start; the operator must opt in.
    Refuse,
}

#[derive(Debug, Clone)]
pub struct TrackOptions {
    pub resume: ResumePolicy,
    /// One dependency wait window.
    pub dependency_timeout: Duration,
    pub poll_interval: Duration,
    /// Attempts per task when no retry strategy is installed.
    pub max_attempts: u32,
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            resume: ResumePolicy::Resume,
            dependency_timeout: Duration::from_secs(3600),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    Completed,
    /// A completion marker existed before this run; nothing was executed.
    AlreadyComplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackReport {
    pub track_id: String,
    pub status: TrackStatus,
    /// Task ids executed by this run, in order.
    pub executed: Vec<String>,
    /// Task ids skipped because a checkpoint covered them.
    pub skipped: Vec<String>,
    pub final_commit: Option<String>,
}
