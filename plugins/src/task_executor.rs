//! Shell-command task executor: red, green, optional refactor, commit.
//!
//! Each attempt runs the configured `verify` command first and requires it to
//! fail. Then `implement` runs, `verify` must pass, and an optional `refactor`
//! step must keep it passing. The change is committed on the track branch and
//! the commit becomes the task's evidence.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use packetflow_core::api::{
    CommandsConfig, Task, TaskContext, TaskEvidence, TaskExecutor, TaskOutcome,
};

use crate::command::{run_shell, CommandOutput};
use crate::git::GitWorkspace;

pub struct CommandTaskExecutor {
    shell: String,
    verify: String,
    implement: String,
    refactor: Option<String>,
    timeout: Duration,
    git: GitWorkspace,
}

impl CommandTaskExecutor {
    /// Fails when `verify` or `implement` is not configured.
    pub fn from_config(commands: &CommandsConfig) -> Result<Self> {
        let verify = commands
            .verify
            .clone()
            .context("executor.commands.verify is not configured")?;
        let implement = commands
            .implement
            .clone()
            .context("executor.commands.implement is not configured")?;
        Ok(Self {
            shell: commands.shell.clone(),
            verify,
            implement,
            refactor: commands.refactor.clone(),
            timeout: Duration::from_secs(commands.timeout_secs),
            git: GitWorkspace::new(),
        })
    }

    async fn step(&self, script: &str, cwd: &Path, envs: &[(String, String)]) -> Result<CommandOutput> {
        run_shell(&self.shell, script, cwd, envs, self.timeout).await
    }
}

/// Stands in when the commands are missing so non-executing subcommands
/// (`plan`, `status`, `merge`) still start. Every attempt fails with the
/// configuration error.
pub struct UnconfiguredTaskExecutor {
    reason: String,
}

impl UnconfiguredTaskExecutor {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TaskExecutor for UnconfiguredTaskExecutor {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn attempt(&self, _task: &Task, _ctx: &TaskContext) -> Result<TaskOutcome> {
        anyhow::bail!("{}", self.reason)
    }
}

/// Environment handed to every command of an attempt.
pub fn task_env(task: &Task, ctx: &TaskContext) -> Vec<(String, String)> {
    let mut envs = vec![
        ("PACKETFLOW_FEATURE_ID".to_string(), ctx.feature_id.clone()),
        ("PACKETFLOW_TRACK_ID".to_string(), ctx.track_id.clone()),
        ("PACKETFLOW_BRANCH".to_string(), ctx.branch.clone()),
        ("PACKETFLOW_TASK_ID".to_string(), task.id.clone()),
        ("PACKETFLOW_TASK_DESCRIPTION".to_string(), task.description.clone()),
        ("PACKETFLOW_TARGET_FILES".to_string(), task.target_files.join("\n")),
        (
            "PACKETFLOW_ACCEPTANCE_CRITERIA".to_string(),
            task.acceptance_criteria.join("\n"),
        ),
        ("PACKETFLOW_ATTEMPT".to_string(), ctx.attempt.to_string()),
        ("PACKETFLOW_HINTS".to_string(), ctx.hints.join("\n")),
    ];
    if let Some(prev) = &ctx.previous_rejection {
        envs.push(("PACKETFLOW_PREVIOUS_REJECTION".to_string(), prev.clone()));
    }
    envs
}

#[async_trait]
impl TaskExecutor for CommandTaskExecutor {
    fn name(&self) -> &str {
        "command"
    }

    async fn attempt(&self, task: &Task, ctx: &TaskContext) -> Result<TaskOutcome> {
        let envs = task_env(task, ctx);
        let cwd = ctx.worktree.as_path();

        let red = self.step(&self.verify, cwd, &envs).await?;
        if red.success {
            return Ok(TaskOutcome::Rejected {
                reason: "verification already passes before the change; write a failing check first"
                    .to_string(),
            });
        }
        tracing::debug!(track = %ctx.track_id, task = %task.id, "red: {}", red.summary());

        let implement = self.step(&self.implement, cwd, &envs).await?;
        if !implement.success {
            return Ok(TaskOutcome::Rejected {
                reason: format!("implement step failed ({})", implement.summary()),
            });
        }

        let green = self.step(&self.verify, cwd, &envs).await?;
        if !green.success {
            return Ok(TaskOutcome::Rejected {
                reason: format!("verification still failing ({})", green.summary()),
            });
        }

        if let Some(refactor) = &self.refactor {
            let out = self.step(refactor, cwd, &envs).await?;
            if !out.success {
                return Ok(TaskOutcome::Rejected {
                    reason: format!("refactor step failed ({})", out.summary()),
                });
            }
            let still_green = self.step(&self.verify, cwd, &envs).await?;
            if !still_green.success {
                return Ok(TaskOutcome::Rejected {
                    reason: format!("refactor broke verification ({})", still_green.summary()),
                });
            }
        }

        let message = format!("{}: task {} {}", ctx.track_id, task.id, task.description);
        let commit_ref = self.git.commit_all(cwd, &message).await?;

        Ok(TaskOutcome::Accepted(TaskEvidence {
            red_observed: true,
            commit_ref,
            notes: Some(format!("red then green on attempt {}", ctx.attempt)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn task() -> Task {
        Task {
            id: "2".into(),
            description: "apply coupon".into(),
            target_files: vec!["src/cart.rs".into(), "tests/cart.rs".into()],
            acceptance_criteria: vec!["coupon lowers total".into()],
        }
    }

    fn ctx(worktree: PathBuf) -> TaskContext {
        TaskContext {
            feature_id: "checkout".into(),
            track_id: "A".into(),
            worktree,
            branch: "track/A".into(),
            attempt: 1,
            hints: vec!["check rounding".into()],
            previous_rejection: None,
        }
    }

    #[test]
    fn env_carries_task_fields() {
        let envs = task_env(&task(), &ctx(PathBuf::from(".")));
        let get = |k: &str| envs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("PACKETFLOW_TASK_ID"), Some("2"));
        assert_eq!(get("PACKETFLOW_TARGET_FILES"), Some("src/cart.rs\ntests/cart.rs"));
        assert_eq!(get("PACKETFLOW_HINTS"), Some("check rounding"));
        assert_eq!(get("PACKETFLOW_PREVIOUS_REJECTION"), None);
    }

    #[test]
    fn verify_and_implement_are_required() {
        let err = CommandTaskExecutor::from_config(&CommandsConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("verify"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn passing_verification_before_the_change_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let commands = CommandsConfig {
            verify: Some("true".into()),
            implement: Some("true".into()),
            ..CommandsConfig::default()
        };
        let exec = CommandTaskExecutor::from_config(&commands).unwrap();
        let outcome = exec.attempt(&task(), &ctx(dir.path().to_path_buf())).await.unwrap();
        match outcome {
            TaskOutcome::Rejected { reason } => assert!(reason.contains("already passes")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn implement_that_does_not_fix_verification_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let commands = CommandsConfig {
            verify: Some("test -f done".into()),
            implement: Some("echo working".into()),
            ..CommandsConfig::default()
        };
        let exec = CommandTaskExecutor::from_config(&commands).unwrap();
        let outcome = exec.attempt(&task(), &ctx(dir.path().to_path_buf())).await.unwrap();
        match outcome {
            TaskOutcome::Rejected { reason } => assert!(reason.contains("still failing")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
