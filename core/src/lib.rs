//! Dependency-ordered, resumable work-packet orchestration.
//!
//! A feature is described by a manifest of tracks. Tracks are ordered into
//! rounds by their dependencies, each track runs its task packet through a
//! checkpointed loop, and completed tracks are merged back round by round
//! behind post-merge gates.

pub mod api;
pub mod checkpoint;
pub mod completion;
pub mod config;
pub mod context;
pub mod decision;
pub mod engine;
pub mod error;
pub mod knowledge;
pub mod manifest;
pub mod merge;
pub mod render;
pub mod scheduler;
pub mod track;
pub mod util;
