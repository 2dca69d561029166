//! Append-only JSONL store of task notes.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use packetflow_core::api::{KnowledgeBase, KnowledgeNote, Task};

/// Notes recalled per task.
const RECALL_LIMIT: usize = 5;

pub struct JsonlKnowledgeBase {
    path: PathBuf,
}

impl JsonlKnowledgeBase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_all(&self) -> Result<Vec<KnowledgeNote>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", self.path.display()));
            }
        };
        let mut notes = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<KnowledgeNote>(line) {
                Ok(n) => notes.push(n),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = lineno + 1,
                    error = %e,
                    "skipping malformed knowledge line"
                ),
            }
        }
        Ok(notes)
    }
}

#[async_trait]
impl KnowledgeBase for JsonlKnowledgeBase {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn recall(&self, track_id: &str, task: &Task) -> Result<Vec<String>> {
        let notes = self.read_all().await?;
        let mut hits: Vec<String> = notes
            .into_iter()
            .filter(|n| n.track_id == track_id && n.task_id == task.id)
            .map(|n| {
                let tag = if n.accepted { "accepted" } else { "rejected" };
                format!("[{tag}] {}", n.note)
            })
            .collect();
        if hits.len() > RECALL_LIMIT {
            hits.drain(..hits.len() - RECALL_LIMIT);
        }
        Ok(hits)
    }

    async fn record(&self, note: &KnowledgeNote) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_string(note)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("open {}", self.path.display()))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn task(id: &str) -> Task {
        Task {
            id: id.into(),
            description: "d".into(),
            target_files: vec![],
            acceptance_criteria: vec![],
        }
    }

    #[tokio::test]
    async fn recall_returns_recent_notes_for_the_same_task() {
        let dir = tempfile::tempdir().unwrap();
        let kb = JsonlKnowledgeBase::new(dir.path().join("state/knowledge.jsonl"));

        assert!(kb.recall("A", &task("1")).await.unwrap().is_empty());

        kb.record(&KnowledgeNote::new("A", "1", false, "rounding off by one"))
            .await
            .unwrap();
        kb.record(&KnowledgeNote::new("B", "1", true, "other track"))
            .await
            .unwrap();
        for i in 0..6 {
            kb.record(&KnowledgeNote::new("A", "1", true, format!("n{i}")))
                .await
                .unwrap();
        }

        let hints = kb.recall("A", &task("1")).await.unwrap();
        assert_eq!(hints.len(), RECALL_LIMIT);
        assert_eq!(hints[0], "[accepted] n1");
        assert_eq!(hints[4], "[accepted] n5");
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.jsonl");
        std::fs::write(&path, "not json\n").unwrap();
        let kb = JsonlKnowledgeBase::new(&path);
        kb.record(&KnowledgeNote::new("A", "1", false, "flaky fixture"))
            .await
            .unwrap();

        assert_eq!(
            kb.recall("A", &task("1")).await.unwrap(),
            vec!["[rejected] flaky fixture"]
        );
    }
}
