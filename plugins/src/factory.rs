use std::sync::Arc;
use std::time::Duration;

use packetflow_core::api::{
    AppConfig, DecisionHandler, GateRunner, Integrator, KnowledgeBase, Manifest, NullRenderer,
    OutputRendererPlugin, RetryStrategyPlugin, RunSettings, TaskExecutor, Workspace,
};

use crate::decisions::PresetDecisionHandler;
use crate::gates::CommandGateRunner;
use crate::git::{GitIntegrator, GitWorkspace};
use crate::knowledge::JsonlKnowledgeBase;
use crate::renderers::{JsonlRendererPlugin, TextRendererPlugin};
use crate::retry::{ExponentialBackoffPlugin, LinearRetryPlugin};
use crate::task_executor::{CommandTaskExecutor, UnconfiguredTaskExecutor};

pub fn build_task_executor(cfg: &AppConfig) -> Arc<dyn TaskExecutor> {
    match CommandTaskExecutor::from_config(&cfg.executor.commands) {
        Ok(exec) => Arc::new(exec),
        Err(e) => {
            tracing::debug!(error = %e, "task commands not configured");
            Arc::new(UnconfiguredTaskExecutor::new(e.to_string()))
        }
    }
}

pub fn build_workspace() -> Arc<dyn Workspace> {
    Arc::new(GitWorkspace::new())
}

pub fn build_integrator(cfg: &AppConfig, manifest: &Manifest) -> Arc<dyn Integrator> {
    Arc::new(GitIntegrator::new(cfg.base_worktree(&manifest.root)))
}

pub fn build_gates(cfg: &AppConfig, manifest: &Manifest) -> Arc<dyn GateRunner> {
    Arc::new(CommandGateRunner::new(
        cfg.executor.commands.shell.clone(),
        cfg.gates.clone(),
        cfg.base_worktree(&manifest.root),
        Duration::from_secs(cfg.executor.commands.timeout_secs),
    ))
}

pub fn build_decisions(cfg: &AppConfig, settings: &RunSettings) -> Arc<dyn DecisionHandler> {
    Arc::new(PresetDecisionHandler::new(
        settings.on_dependency_timeout,
        cfg.scheduler.max_wait_extensions,
    ))
}

pub fn build_knowledge(cfg: &AppConfig, manifest: &Manifest) -> Option<Arc<dyn KnowledgeBase>> {
    if !cfg.knowledge.enabled {
        return None;
    }
    Some(Arc::new(JsonlKnowledgeBase::new(
        cfg.knowledge_path(&manifest.root),
    )))
}

/// `none` (or an unknown name) leaves retries to `executor.max_attempts` alone.
pub fn build_retry(cfg: &AppConfig) -> Option<Arc<dyn RetryStrategyPlugin>> {
    let retry = cfg.executor.retry.clone();
    let max_attempts = cfg.executor.max_attempts;
    match retry.strategy.as_str() {
        "exponential-backoff" | "exponential" => {
            Some(Arc::new(ExponentialBackoffPlugin::new(retry, max_attempts)))
        }
        "linear" => Some(Arc::new(LinearRetryPlugin::new(retry, max_attempts))),
        "none" => None,
        other => {
            tracing::warn!(strategy = other, "unknown retry strategy, retrying without delay");
            None
        }
    }
}

pub fn build_renderer(format: &str) -> Arc<dyn OutputRendererPlugin> {
    match format {
        "jsonl" => Arc::new(JsonlRendererPlugin::new(false)),
        "none" | "quiet" => Arc::new(NullRenderer),
        _ => Arc::new(TextRendererPlugin::new(cfg!(windows))),
    }
}
