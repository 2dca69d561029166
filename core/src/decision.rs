//! Suspend points.
//!
//! Wherever the workflow needs an operator or collaborator to choose, the
//! state machine raises a structured [`DecisionRequest`]. A handler either
//! answers right away or returns `None`; in that case the caller moves to
//! `WaitingOnDecision`, persists what it needs and suspends with a remediation
//! hint instead of blocking on ad hoc I/O.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionRequest {
    /// Dependencies of `track` did not complete within one timeout window.
    DependencyTimeout {
        track: String,
        missing: Vec<String>,
        waited_secs: u64,
        extensions: u32,
    },
    /// Integrating `track` into the base conflicts; needs the conflict-resolution collaborator.
    MergeConflict {
        round: usize,
        track: String,
        paths: Vec<String>,
    },
    /// A post-merge gate failed for `round`; needs the debugging collaborator.
    RoundTestFailure {
        round: usize,
        gate: String,
        summary: String,
        attempt: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Keep polling for another timeout window.
    Wait,
    /// Give up on the blocked step.
    Abort,
    /// The conflict has been resolved in the base worktree.
    Resolved,
    /// Run the failed gate again.
    Retry,
}

impl DecisionRequest {
    /// Whether `decision` is a meaningful answer to this request.
    pub fn accepts(&self, decision: Decision) -> bool {
        match self {
            Self::DependencyTimeout { .. } => matches!(decision, Decision::Wait | Decision::Abort),
            Self::MergeConflict { .. } => matches!(decision, Decision::Resolved | Decision::Abort),
            Self::RoundTestFailure { .. } => matches!(decision, Decision::Retry | Decision::Abort),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::DependencyTimeout { .. } => "dependency_timeout",
            Self::MergeConflict { .. } => "merge_conflict",
            Self::RoundTestFailure { .. } => "round_test_failure",
        }
    }
}

#[async_trait]
pub trait DecisionHandler: Send + Sync {
    fn name(&self) -> &str;

    /// `None` means no decision is available now: suspend.
    async fn decide(&self, request: &DecisionRequest) -> Option<Decision>;
}

/// Answer nothing; every request suspends.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeferAll;

#[async_trait]
impl DecisionHandler for DeferAll {
    fn name(&self) -> &str {
        "defer-all"
    }

    async fn decide(&self, _request: &DecisionRequest) -> Option<Decision> {
        None
    }
}

/// Ask `handler`, dropping answers that do not fit the request.
pub async fn decide_checked(
    handler: &dyn DecisionHandler,
    request: &DecisionRequest,
) -> Option<Decision> {
    let decision = handler.decide(request).await?;
    if request.accepts(decision) {
        tracing::info!(handler = handler.name(), kind = request.kind(), ?decision, "decision received");
        Some(decision)
    } else {
        tracing::warn!(
            handler = handler.name(),
            kind = request.kind(),
            ?decision,
            "ignoring decision that does not apply to this request"
        );
        None
    }
}
