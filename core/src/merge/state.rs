use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::util::{read_json, write_json_atomic};

pub const MERGE_STATE_FILE: &str = "merge.json";
pub const MERGE_STATE_FORMAT_VERSION: u32 = 1;

/// Escalation a merge is suspended on. Round numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingEscalation {
    Conflict {
        round: usize,
        track: String,
        paths: Vec<String>,
    },
    GateFailure {
        round: usize,
        gate: String,
        summary: String,
    },
}

impl PendingEscalation {
    pub fn round(&self) -> usize {
        match self {
            Self::Conflict { round, .. } | Self::GateFailure { round, .. } => *round,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Conflict { round, track, paths } => format!(
                "round {round}: conflict merging '{track}' ({})",
                paths.join(", ")
            ),
            Self::GateFailure { round, gate, .. } => {
                format!("round {round}: gate '{gate}' failed")
            }
        }
    }
}

/// Merge progress, persisted after every step so `--continue` can pick up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeState {
    pub format_version: u32,
    pub feature_id: String,
    /// Rounds whose gates passed. Always a prefix of the round order.
    pub rounds_passed: usize,
    /// Tracks integrated into the base so far, in merge order.
    pub integrated: Vec<String>,
    pub pending: Option<PendingEscalation>,
    pub updated_at: DateTime<Utc>,
}

impl MergeState {
    pub fn new(feature_id: impl Into<String>) -> Self {
        Self {
            format_version: MERGE_STATE_FORMAT_VERSION,
            feature_id: feature_id.into(),
            rounds_passed: 0,
            integrated: Vec::new(),
            pending: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_integrated(&self, track_id: &str) -> bool {
        self.integrated.iter().any(|t| t == track_id)
    }
}

#[derive(Debug, Clone)]
pub struct MergeStateStore {
    path: PathBuf,
}

impl MergeStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<state_dir>/merge.json`.
    pub fn in_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join(MERGE_STATE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<MergeState>, StoreError> {
        let Some(state) = read_json::<MergeState>(&self.path)? else {
            return Ok(None);
        };
        if state.format_version != MERGE_STATE_FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                path: self.path.clone(),
                found: state.format_version,
            });
        }
        Ok(Some(state))
    }

    pub fn save(&self, state: &mut MergeState) -> Result<(), StoreError> {
        state.updated_at = Utc::now();
        write_json_atomic(&self.path, state)
    }
}
