use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::util::{file_key, read_json, write_json_atomic};

pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// Latest progress of one track. Each save replaces the previous checkpoint;
/// there is no history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub format_version: u32,
    #[serde(rename = "track")]
    pub track_id: String,
    #[serde(rename = "lastCompletedTask")]
    pub last_completed_task_id: String,
    #[serde(rename = "commit")]
    pub commit_ref: String,
    pub timestamp: DateTime<Utc>,
    /// `None` once the last task of the packet has been completed.
    #[serde(rename = "nextTask")]
    pub next_task_id: Option<String>,
}

impl Checkpoint {
    pub fn new(
        track_id: impl Into<String>,
        last_completed_task_id: impl Into<String>,
        commit_ref: impl Into<String>,
        next_task_id: Option<String>,
    ) -> Self {
        Self {
            format_version: CHECKPOINT_FORMAT_VERSION,
            track_id: track_id.into(),
            last_completed_task_id: last_completed_task_id.into(),
            commit_ref: commit_ref.into(),
            timestamp: Utc::now(),
            next_task_id,
        }
    }
}

/// Durable per-track checkpoint storage, one JSON file per track.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Atomically replace the checkpoint of `checkpoint.track_id`. Saving the
    /// same checkpoint twice leaves the same state.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        let path = self.path_for(&checkpoint.track_id)?;
        write_json_atomic(&path, checkpoint)?;
        tracing::debug!(
            track = %checkpoint.track_id,
            last = %checkpoint.last_completed_task_id,
            next = ?checkpoint.next_task_id,
            "checkpoint saved"
        );
        Ok(())
    }

    /// `Ok(None)` when the track has no checkpoint.
    pub fn load(&self, track_id: &str) -> Result<Option<Checkpoint>, StoreError> {
        let path = self.path_for(track_id)?;
        let Some(cp) = read_json::<Checkpoint>(&path)? else {
            return Ok(None);
        };
        if cp.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                path,
                found: cp.format_version,
            });
        }
        Ok(Some(cp))
    }

    /// Remove the checkpoint so the track starts over. Returns whether one existed.
    pub fn clear(&self, track_id: &str) -> Result<bool, StoreError> {
        let path = self.path_for(track_id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn path_for(&self, track_id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.dir.join(format!("{}.json", file_key(track_id)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn save_replaces_previous_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());

        store
            .save(&Checkpoint::new("T", "1", "abc", Some("2".into())))
            .unwrap();
        let second = Checkpoint::new("T", "2", "def", Some("3".into()));
        store.save(&second).unwrap();
        store.save(&second).unwrap();

        assert_eq!(store.load("T").unwrap(), Some(second));
        assert_eq!(store.load("other").unwrap(), None);
    }

    #[test]
    fn on_disk_format_uses_wire_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store
            .save(&Checkpoint::new("T", "4", "c0ffee", None))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("T.json")).unwrap())
                .unwrap();
        assert_eq!(raw["formatVersion"], 1);
        assert_eq!(raw["track"], "T");
        assert_eq!(raw["lastCompletedTask"], "4");
        assert_eq!(raw["commit"], "c0ffee");
        assert!(raw["nextTask"].is_null());
        assert!(raw["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn clear_and_version_guard() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path());
        store
            .save(&Checkpoint::new("T", "1", "abc", None))
            .unwrap();
        assert!(store.clear("T").unwrap());
        assert!(!store.clear("T").unwrap());

        let mut future = Checkpoint::new("U", "1", "abc", None);
        future.format_version = 7;
        std::fs::write(
            dir.path().join("U.json"),
            serde_json::to_string(&future).unwrap(),
        )
        .unwrap();
        assert!(matches!(
            store.load("U"),
            Err(StoreError::UnsupportedVersion { found: 7, .. })
        ));
    }
}
