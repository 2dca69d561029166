use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Name of the per-run state directory created next to the manifest.
pub const DEFAULT_STATE_DIR_NAME: &str = ".packetflow";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub merge: MergeConfig,

    /// Post-merge gate id -> shell command run in the base worktree.
    #[serde(default)]
    pub gates: BTreeMap<String, String>,

    #[serde(default)]
    pub state: StateConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_true")]
    pub console: bool,

    /// If true, also log to `packetflow.<pid>.log` under `directory`.
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "packetflow_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    #[serde(default)]
    pub directory: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            console: true,
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Tracks of one round running at the same time.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// One dependency wait window; a `wait` decision adds another.
    #[serde(default = "default_dependency_timeout_secs")]
    pub dependency_timeout_secs: u64,

    /// Extra windows granted by `--on-dependency-timeout wait`.
    #[serde(default = "default_max_wait_extensions")]
    pub max_wait_extensions: u32,
}

fn default_max_parallel() -> usize {
    4
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_dependency_timeout_secs() -> u64 {
    3600
}

fn default_max_wait_extensions() -> u32 {
    3
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            poll_interval_secs: default_poll_interval_secs(),
            dependency_timeout_secs: default_dependency_timeout_secs(),
            max_wait_extensions: default_max_wait_extensions(),
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn dependency_timeout(&self) -> Duration {
        Duration::from_secs(self.dependency_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Attempts per task, the first one included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub commands: CommandsConfig,
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry: RetryConfig::default(),
            commands: CommandsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// `exponential-backoff`, `linear` or `none`.
    #[serde(default = "default_retry_strategy")]
    pub strategy: String,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_retry_strategy() -> String {
    "exponential-backoff".to_string()
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: default_retry_strategy(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Shell commands the command-driven task executor runs inside a worktree.
///
/// `verify` must fail before `implement` runs and pass after it; `refactor`
/// is optional and followed by another `verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_shell")]
    pub shell: String,
    #[serde(default)]
    pub verify: Option<String>,
    #[serde(default)]
    pub implement: Option<String>,
    #[serde(default)]
    pub refactor: Option<String>,
    /// Upper bound for any single command.
    #[serde(default = "default_command_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_shell() -> String {
    if cfg!(windows) { "cmd" } else { "sh" }.to_string()
}

fn default_command_timeout_secs() -> u64 {
    1800
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            verify: None,
            implement: None,
            refactor: None,
            timeout_secs: default_command_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Worktree holding the shared base branch. Defaults to the manifest directory.
    #[serde(default)]
    pub base_worktree: Option<String>,

    /// Gate re-runs granted by `retry` decisions per round.
    #[serde(default = "default_max_gate_retries")]
    pub max_gate_retries: u32,
}

fn default_max_gate_retries() -> u32 {
    1
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            base_worktree: None,
            max_gate_retries: default_max_gate_retries(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateConfig {
    /// Where checkpoints, completion markers and merge state live.
    /// Relative paths resolve against the manifest directory.
    #[serde(default)]
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default)]
    pub enabled: bool,
    /// JSONL notes file; defaults to `<state_dir>/knowledge.jsonl`.
    #[serde(default)]
    pub path: Option<String>,
}

impl AppConfig {
    pub fn state_dir(&self, manifest_root: &Path) -> PathBuf {
        match self.state.dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => resolve(manifest_root, dir),
            _ => manifest_root.join(DEFAULT_STATE_DIR_NAME),
        }
    }

    pub fn checkpoint_dir(&self, manifest_root: &Path) -> PathBuf {
        self.state_dir(manifest_root).join("checkpoints")
    }

    pub fn completion_dir(&self, manifest_root: &Path) -> PathBuf {
        self.state_dir(manifest_root).join("completed")
    }

    pub fn base_worktree(&self, manifest_root: &Path) -> PathBuf {
        match self.merge.base_worktree.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => resolve(manifest_root, dir),
            _ => manifest_root.to_path_buf(),
        }
    }

    pub fn knowledge_path(&self, manifest_root: &Path) -> PathBuf {
        match self.knowledge.path.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => resolve(manifest_root, p),
            _ => self.state_dir(manifest_root).join("knowledge.jsonl"),
        }
    }

    /// Reject values no run could work with.
    pub fn validate(&self) -> Result<(), String> {
        if self.scheduler.max_parallel == 0 {
            return Err("scheduler.max_parallel must be at least 1".into());
        }
        if self.executor.max_attempts == 0 {
            return Err("executor.max_attempts must be at least 1".into());
        }
        match self.executor.retry.strategy.as_str() {
            "exponential-backoff" | "linear" | "none" => {}
            other => return Err(format!("unknown executor.retry.strategy '{other}'")),
        }
        if let Some((id, _)) = self.gates.iter().find(|(_, cmd)| cmd.trim().is_empty()) {
            return Err(format!("gate '{id}' has an empty command"));
        }
        Ok(())
    }

    /// Gate ids that `post_merge_qa` asks for but no command is configured for.
    pub fn missing_gates<'a>(&self, gate_ids: &'a [String]) -> Vec<&'a str> {
        gate_ids
            .iter()
            .filter(|id| !self.gates.contains_key(id.as_str()))
            .map(String::as_str)
            .collect()
    }
}

fn resolve(root: &Path, p: &str) -> PathBuf {
    let p = Path::new(p);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}
