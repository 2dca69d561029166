//! Completion registry: durable, idempotent "track done" markers and the
//! `wait_for` primitive used for cross-track blocking.

mod registry;

pub use registry::{
    CompletionMarker, CompletionRegistry, MarkOutcome, WaitOutcome, DEFAULT_POLL_INTERVAL,
};
