use std::sync::Arc;

use crate::checkpoint::CheckpointStore;
use crate::completion::CompletionRegistry;
use crate::config::AppConfig;
use crate::decision::DecisionHandler;
use crate::engine::ExecutionEngine;
use crate::knowledge::KnowledgeBase;
use crate::manifest::Manifest;
use crate::merge::{GateRunner, Integrator, MergeOrchestrator, MergeStateStore};
use crate::render::OutputRendererPlugin;
use crate::track::{
    ResumePolicy, RetryStrategyPlugin, TaskExecutor, TrackExecutor, TrackOptions, Workspace,
};

/// What to answer when dependencies are still missing after a wait window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyTimeoutPolicy {
    /// Grant up to `scheduler.max_wait_extensions` more windows.
    Wait,
    Abort,
}

/// Per-invocation choices made on the command line.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// `text` or `jsonl`.
    pub format: String,
    pub on_dependency_timeout: DependencyTimeoutPolicy,
    pub progress: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            on_dependency_timeout: DependencyTimeoutPolicy::Abort,
            progress: false,
        }
    }
}

/// Concrete collaborators behind the core traits.
#[derive(Clone)]
pub struct Services {
    pub task_executor: Arc<dyn TaskExecutor>,
    pub workspace: Arc<dyn Workspace>,
    pub integrator: Arc<dyn Integrator>,
    pub gates: Arc<dyn GateRunner>,
    pub decisions: Arc<dyn DecisionHandler>,
    pub knowledge: Option<Arc<dyn KnowledgeBase>>,
    pub retry: Option<Arc<dyn RetryStrategyPlugin>>,
    pub renderer: Arc<dyn OutputRendererPlugin>,
}

#[async_trait::async_trait]
pub trait ServicesFactory: Send + Sync {
    async fn build_services(
        &self,
        cfg: &AppConfig,
        manifest: &Manifest,
        settings: &RunSettings,
    ) -> anyhow::Result<Services>;
}

/// Everything one CLI invocation works with: config, manifest, stores and
/// collaborators.
#[derive(Clone)]
pub struct AppContext {
    cfg: AppConfig,
    manifest: Arc<Manifest>,
    settings: RunSettings,
    services: Services,
}

impl AppContext {
    pub async fn new(
        cfg: AppConfig,
        manifest: Manifest,
        settings: RunSettings,
        factory: &dyn ServicesFactory,
    ) -> anyhow::Result<Self> {
        let services = factory.build_services(&cfg, &manifest, &settings).await?;
        Ok(Self::with_services(cfg, manifest, settings, services))
    }

    pub fn with_services(
        cfg: AppConfig,
        manifest: Manifest,
        settings: RunSettings,
        services: Services,
    ) -> Self {
        Self {
            cfg,
            manifest: Arc::new(manifest),
            settings,
            services,
        }
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn checkpoints(&self) -> CheckpointStore {
        CheckpointStore::new(self.cfg.checkpoint_dir(&self.manifest.root))
    }

    pub fn registry(&self) -> CompletionRegistry {
        CompletionRegistry::new(self.cfg.completion_dir(&self.manifest.root))
            .with_poll_interval(self.cfg.scheduler.poll_interval())
    }

    pub fn merge_store(&self) -> MergeStateStore {
        MergeStateStore::in_dir(&self.cfg.state_dir(&self.manifest.root))
    }

    pub fn track_options(&self, resume: ResumePolicy) -> TrackOptions {
        TrackOptions {
            resume,
            dependency_timeout: self.cfg.scheduler.dependency_timeout(),
            poll_interval: self.cfg.scheduler.poll_interval(),
            max_attempts: self.cfg.executor.max_attempts,
        }
    }

    pub fn track_executor(&self, resume: ResumePolicy) -> TrackExecutor {
        let s = &self.services;
        let mut executor = TrackExecutor::new(
            self.manifest.clone(),
            self.checkpoints(),
            self.registry(),
            s.task_executor.clone(),
            s.workspace.clone(),
        )
        .with_decisions(s.decisions.clone())
        .with_renderer(s.renderer.clone())
        .with_options(self.track_options(resume));

        if let Some(kb) = &s.knowledge {
            executor = executor.with_knowledge(kb.clone());
        }
        if let Some(retry) = &s.retry {
            executor = executor.with_retry_strategy(retry.clone());
        }
        executor
    }

    /// Engine for run-all; checkpoints are always honoured there.
    pub fn engine(&self) -> ExecutionEngine {
        ExecutionEngine::new(self.track_executor(ResumePolicy::Resume), self.registry())
            .with_max_parallel(self.cfg.scheduler.max_parallel)
            .with_renderer(self.services.renderer.clone())
            .with_progress_bar(self.settings.progress)
    }

    pub fn merge_orchestrator(&self) -> MergeOrchestrator {
        let s = &self.services;
        MergeOrchestrator::new(
            self.manifest.clone(),
            self.registry(),
            self.merge_store(),
            s.integrator.clone(),
            s.gates.clone(),
        )
        .with_decisions(s.decisions.clone())
        .with_renderer(s.renderer.clone())
        .with_max_gate_retries(self.cfg.merge.max_gate_retries)
    }
}
