use async_trait::async_trait;

use crate::manifest::{MergeStrategy, Track};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationOutcome {
    Clean { commit: String },
    /// The merge stopped on conflicts; the base worktree holds the partial merge.
    Conflict { paths: Vec<String> },
}

/// Folds completed track branches into the shared base.
#[async_trait]
pub trait Integrator: Send + Sync {
    fn name(&self) -> &str;

    async fn integrate(
        &self,
        track: &Track,
        strategy: MergeStrategy,
    ) -> anyhow::Result<IntegrationOutcome>;

    /// Finish a merge whose conflicts were resolved in the base worktree.
    /// Reports `Conflict` again while unmerged paths remain.
    async fn conclude(
        &self,
        track: &Track,
        strategy: MergeStrategy,
    ) -> anyhow::Result<IntegrationOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateReport {
    pub passed: bool,
    pub summary: String,
}

/// Runs one post-merge gate against the shared base.
#[async_trait]
pub trait GateRunner: Send + Sync {
    async fn run_gate(&self, gate: &str) -> anyhow::Result<GateReport>;
}
