use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use packetflow_core::api::{GateReport, GateRunner};

use crate::command::run_shell;

/// Runs each post-merge gate as a shell command in the base worktree.
pub struct CommandGateRunner {
    shell: String,
    commands: BTreeMap<String, String>,
    cwd: PathBuf,
    timeout: Duration,
}

impl CommandGateRunner {
    pub fn new(
        shell: impl Into<String>,
        commands: BTreeMap<String, String>,
        cwd: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            shell: shell.into(),
            commands,
            cwd: cwd.into(),
            timeout,
        }
    }
}

#[async_trait]
impl GateRunner for CommandGateRunner {
    async fn run_gate(&self, gate: &str) -> Result<GateReport> {
        let Some(script) = self.commands.get(gate) else {
            anyhow::bail!("no command configured for gate '{gate}' (add it under [gates])");
        };
        tracing::info!(gate, cwd = %self.cwd.display(), "running gate");
        let out = run_shell(&self.shell, script, &self.cwd, &[], self.timeout).await?;
        Ok(GateReport {
            passed: out.success,
            summary: out.summary(),
        })
    }
}
