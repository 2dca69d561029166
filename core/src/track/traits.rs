use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{TaskContext, TaskOutcome};
use crate::manifest::Task;

/// Performs the actual work of one task inside a track's worktree.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    fn name(&self) -> &str;

    /// One attempt at `task`. `Err` is treated like a rejected attempt.
    async fn attempt(&self, task: &Task, ctx: &TaskContext) -> anyhow::Result<TaskOutcome>;
}

/// Read-only view of a worktree used before and after the task loop.
#[async_trait]
pub trait Workspace: Send + Sync {
    async fn current_branch(&self, worktree: &Path) -> anyhow::Result<String>;

    async fn head_commit(&self, worktree: &Path) -> anyhow::Result<String>;
}

/// Retry strategy plugin
pub trait RetryStrategyPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Delay before the attempt after `attempt` (1-based). `None` stops retrying.
    fn next_delay(&self, attempt: u32, reason: &str) -> Option<Duration>;

    /// Total attempts per task, the first one included.
    fn max_attempts(&self) -> u32;

    fn should_retry(&self, attempt: u32, reason: &str) -> bool {
        attempt < self.max_attempts() && !self.is_fatal(reason)
    }

    fn is_fatal(&self, _reason: &str) -> bool {
        false
    }
}
