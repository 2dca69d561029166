//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `packetflow_core::api` instead of reaching into internal modules.

pub use crate::checkpoint::{Checkpoint, CheckpointStore, CHECKPOINT_FORMAT_VERSION};
pub use crate::completion::{
    CompletionMarker, CompletionRegistry, MarkOutcome, WaitOutcome, DEFAULT_POLL_INTERVAL,
};
pub use crate::config::{
    load_default, load_from, AppConfig, CommandsConfig, LoggingConfig, RetryConfig,
};
pub use crate::context::{
    AppContext, DependencyTimeoutPolicy, RunSettings, Services, ServicesFactory,
};
pub use crate::decision::{Decision, DecisionHandler, DecisionRequest, DeferAll};
pub use crate::engine::{ExecutionEngine, RunSummary, TrackFailure};
pub use crate::error::{
    CliError, CycleError, ExitCode, ManifestError, MergeError, RunError, ScheduleError,
    StoreError, TrackError,
};
pub use crate::knowledge::{KnowledgeBase, KnowledgeNote};
pub use crate::manifest::{
    find_manifest_dir, load, load_packet, track_for_packet, Manifest, MergeStrategy, Task, Track,
    MANIFEST_FILE_NAME,
};
pub use crate::merge::{
    GateReport, GateRunner, IntegrationOutcome, Integrator, MergeMode, MergeOrchestrator,
    MergeReport, MergeState, MergeStateStore, PendingEscalation,
};
pub use crate::render::{NullRenderer, OutputRendererPlugin, RenderEvent};
pub use crate::scheduler::{order, pending_rounds, Round};
pub use crate::track::{
    ResumePolicy, RetryStrategyPlugin, TaskContext, TaskEvidence, TaskExecutor, TaskOutcome,
    TrackExecutor, TrackOptions, TrackPhase, TrackReport, TrackStatus, Workspace,
};
