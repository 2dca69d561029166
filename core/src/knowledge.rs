//! Optional knowledge collaborator: a narrow read/write interface for notes
//! learned while executing tasks. The core never keeps this state itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::manifest::Task;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeNote {
    pub track_id: String,
    pub task_id: String,
    pub accepted: bool,
    pub note: String,
    pub recorded_at: DateTime<Utc>,
}

impl KnowledgeNote {
    pub fn new(
        track_id: impl Into<String>,
        task_id: impl Into<String>,
        accepted: bool,
        note: impl Into<String>,
    ) -> Self {
        Self {
            track_id: track_id.into(),
            task_id: task_id.into(),
            accepted,
            note: note.into(),
            recorded_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    fn name(&self) -> &str;

    /// Hints relevant to `task`, handed to the task executor.
    async fn recall(&self, track_id: &str, task: &Task) -> anyhow::Result<Vec<String>>;

    async fn record(&self, note: &KnowledgeNote) -> anyhow::Result<()>;
}
