use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Command;

/// Bytes of stdout/stderr kept for reports.
const TAIL_BYTES: usize = 4000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout_tail: String,
    pub stderr_tail: String,
}

impl CommandOutput {
    /// Short human summary: the stderr tail, else the stdout tail.
    pub fn summary(&self) -> String {
        let text = if self.stderr_tail.trim().is_empty() {
            self.stdout_tail.trim()
        } else {
            self.stderr_tail.trim()
        };
        let status = match self.exit_code {
            Some(code) => format!("exit {code}"),
            None => "killed".to_string(),
        };
        if text.is_empty() {
            status
        } else {
            let last = text.lines().last().unwrap_or(text);
            format!("{status}: {last}")
        }
    }
}

/// Run `script` through `shell` in `cwd`. A non-zero exit is reported in the
/// output, not as an error; only spawn failures and timeouts are errors.
pub async fn run_shell(
    shell: &str,
    script: &str,
    cwd: &Path,
    envs: &[(String, String)],
    timeout: Duration,
) -> Result<CommandOutput> {
    let flag = if shell.eq_ignore_ascii_case("cmd") { "/C" } else { "-c" };

    tracing::debug!(cwd = %cwd.display(), script = %script, "running command");
    let child = Command::new(shell)
        .arg(flag)
        .arg(script)
        .current_dir(cwd)
        .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to spawn '{shell}' in {}", cwd.display()))?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .with_context(|| format!("'{script}' timed out after {timeout:?}"))??;

    Ok(CommandOutput {
        success: output.status.success(),
        exit_code: output.status.code(),
        stdout_tail: tail(&output.stdout),
        stderr_tail: tail(&output.stderr),
    })
}

fn tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(TAIL_BYTES);
    String::from_utf8_lossy(&bytes[start..]).to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_exit_status_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_shell(
            "sh",
            "echo \"$GREETING\"; echo oops >&2; exit 3",
            dir.path(),
            &[("GREETING".into(), "hello".into())],
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert!(!out.success);
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stdout_tail.trim(), "hello");
        assert_eq!(out.summary(), "exit 3: oops");
    }

    #[tokio::test]
    async fn timeout_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let res = run_shell("sh", "sleep 5", dir.path(), &[], Duration::from_millis(50)).await;
        assert!(res.is_err());
    }
}
