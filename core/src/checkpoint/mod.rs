//! Checkpoint store: latest per-track progress, replaced atomically.

mod store;

pub use store::{Checkpoint, CheckpointStore, CHECKPOINT_FORMAT_VERSION};
