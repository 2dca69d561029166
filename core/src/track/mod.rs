//! Track executor: the per-track state machine.
//!
//! ```text
//! Parsed ──► DependenciesSatisfied ──► Resumed | Fresh ──► WorktreePrepared ──► TaskLoop ──► Completed
//!   ▲  │                                                          │                 │
//!   │  ▼                                                          ▼                 ▼
//!   WaitingOnDecision ───────────────────────────────────────────────────────────► Failed
//! ```
//!
//! Tasks run strictly in packet order. Each accepted task is checkpointed
//! before the next one starts, and a task that is never accepted halts the
//! track; later tasks are not skipped to.

mod executor;
mod state;
mod traits;
mod types;

pub use executor::{resume_index, TrackExecutor};
pub use state::{TrackMachine, TrackPhase, TrackTransition};
pub use traits::{RetryStrategyPlugin, TaskExecutor, Workspace};
pub use types::{
    ResumePolicy, TaskContext, TaskEvidence, TaskOutcome, TrackOptions, TrackReport, TrackStatus,
};
