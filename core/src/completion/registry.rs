use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::util::{file_key, read_json, write_json_new};

/// Default poll cadence for [`CompletionRegistry::wait_for`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Durable proof that a track finished. Write-once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionMarker {
    pub track_id: String,
    pub completed_at: DateTime<Utc>,
    #[serde(rename = "finalCommit")]
    pub final_commit_ref: String,
}

impl CompletionMarker {
    pub fn new(track_id: impl Into<String>, final_commit_ref: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            completed_at: Utc::now(),
            final_commit_ref: final_commit_ref.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Written,
    /// A marker was already present; the registry is unchanged.
    AlreadyComplete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Satisfied,
    TimedOut { missing: Vec<String> },
}

/// Single source of truth for "is track X done". Markers are never retracted.
#[derive(Debug, Clone)]
pub struct CompletionRegistry {
    dir: PathBuf,
    poll_interval: Duration,
}

impl CompletionRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_complete(&self, track_id: &str) -> Result<bool, StoreError> {
        Ok(self.path_for(track_id)?.is_file())
    }

    pub fn marker(&self, track_id: &str) -> Result<Option<CompletionMarker>, StoreError> {
        read_json(&self.path_for(track_id)?)
    }

    /// Record completion. Calling this again for the same track is a no-op,
    /// even when the second marker differs; the first one wins.
    pub fn mark_complete(
        &self,
        track_id: &str,
        marker: &CompletionMarker,
    ) -> Result<MarkOutcome, StoreError> {
        if marker.track_id != track_id {
            return Err(StoreError::InvalidKey(format!(
                "marker for '{}' written under '{track_id}'",
                marker.track_id
            )));
        }

        let path = self.path_for(track_id)?;
        if write_json_new(&path, marker)? {
            tracing::info!(track = %track_id, commit = %marker.final_commit_ref, "track marked complete");
            return Ok(MarkOutcome::Written);
        }

        if let Some(existing) = self.marker(track_id)? {
            if existing.final_commit_ref != marker.final_commit_ref {
                tracing::warn!(
                    track = %track_id,
                    kept = %existing.final_commit_ref,
                    ignored = %marker.final_commit_ref,
                    "completion marker already present, keeping the first one"
                );
            }
        }
        Ok(MarkOutcome::AlreadyComplete)
    }

    /// Ids of every track with a marker.
    pub fn completed_ids(&self) -> Result<HashSet<String>, StoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };

        let mut ids = HashSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
                continue;
            };
            // temp files from in-flight writes start with '.'
            if name.starts_with('.') {
                continue;
            }
            if let Some(id) = name.strip_suffix(".json") {
                ids.insert(id.to_string());
            }
        }
        Ok(ids)
    }

    /// Missing ids among `track_ids`, in the given order.
    pub fn missing(&self, track_ids: &[String]) -> Result<Vec<String>, StoreError> {
        let mut missing = Vec::new();
        for id in track_ids {
            if !self.is_complete(id)? {
                missing.push(id.clone());
            }
        }
        Ok(missing)
    }

    /// Poll until every id has a marker or `timeout` elapses. Cooperative:
    /// only the calling task waits.
    pub async fn wait_for(
        &self,
        track_ids: &[String],
        timeout: Duration,
    ) -> Result<WaitOutcome, StoreError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let missing = self.missing_async(track_ids).await?;
            if missing.is_empty() {
                return Ok(WaitOutcome::Satisfied);
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(WaitOutcome::TimedOut { missing });
            }

            tracing::debug!(missing = ?missing, "waiting for dependencies");
            let remaining = deadline - now;
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }
    }

    /// [`Self::missing`] without blocking the runtime thread between polls.
    async fn missing_async(&self, track_ids: &[String]) -> Result<Vec<String>, StoreError> {
        let mut missing = Vec::new();
        for id in track_ids {
            let path = self.path_for(id)?;
            let present = match tokio::fs::metadata(&path).await {
                Ok(meta) => meta.is_file(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                Err(e) => return Err(StoreError::io(&path, e)),
            };
            if !present {
                missing.push(id.clone());
            }
        }
        Ok(missing)
    }

    fn path_for(&self, track_id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.dir.join(format!("{}.json", file_key(track_id)?)))
    }
}
