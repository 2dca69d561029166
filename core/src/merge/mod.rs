//! Merge orchestrator: folds completed tracks into the shared base, one round
//! at a time, behind the manifest's post-merge gates.
//!
//! Conflicts and gate failures are escalated as decision requests. When no
//! decision is available the merge persists its progress to `merge.json` and
//! suspends; `merge --continue` resumes from there.

mod orchestrator;
mod state;
mod traits;

pub use orchestrator::{MergeMode, MergeOrchestrator, MergeReport};
pub use state::{
    MergeState, MergeStateStore, PendingEscalation, MERGE_STATE_FILE, MERGE_STATE_FORMAT_VERSION,
};
pub use traits::{GateReport, GateRunner, IntegrationOutcome, Integrator};
