use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub type TrackId = String;

/// Manifest format versions this build understands.
pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

/// How a completed track branch is folded into the shared base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// `git merge --no-ff`, keeping the track history.
    Merge,
    /// One squashed commit per track.
    Squash,
}

impl MergeStrategy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" | "no-ff" => Some(Self::Merge),
            "squash" => Some(Self::Squash),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Squash => "squash",
        }
    }
}

/// Common interface for anything the dependency graph can order.
pub trait Schedulable: Clone + Send + Sync {
    fn id(&self) -> &str;
    fn dependencies(&self) -> Vec<&str>;
}

/// An independently schedulable unit of work. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    /// Path of the task packet, relative to the manifest directory.
    pub packet_ref: PathBuf,
    /// Isolated working context, relative to the manifest directory.
    pub worktree_ref: PathBuf,
    pub branch_name: String,
    pub depends_on: BTreeSet<TrackId>,
}

impl Schedulable for Track {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependencies(&self) -> Vec<&str> {
        self.depends_on.iter().map(String::as_str).collect()
    }
}

/// Validated, immutable description of a feature's tracks.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub feature_id: String,
    pub format_version: u32,
    pub tracks: Vec<Track>,
    pub merge_strategy: MergeStrategy,
    /// Ordered post-merge gate identifiers, e.g. `tests`, `lint`.
    pub post_merge_qa: Vec<String>,
    /// Directory the manifest was loaded from; relative refs resolve against it.
    pub root: PathBuf,
}

impl Manifest {
    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_ids(&self) -> Vec<&str> {
        self.tracks.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn packet_path(&self, track: &Track) -> PathBuf {
        resolve(&self.root, &track.packet_ref)
    }

    pub fn worktree_path(&self, track: &Track) -> PathBuf {
        resolve(&self.root, &track.worktree_ref)
    }
}

fn resolve(root: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

/// On-disk shape of `manifest.json`. Every field is optional here so that
/// validation can name the missing field instead of failing inside serde.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawManifest {
    pub format_version: Option<u32>,
    pub feature: Option<String>,
    pub tracks: Option<Vec<RawTrack>>,
    pub merge_strategy: Option<String>,
    #[serde(rename = "postMergeQA", default)]
    pub post_merge_qa: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawTrack {
    pub id: Option<String>,
    pub name: Option<String>,
    pub packet: Option<String>,
    pub worktree: Option<String>,
    pub branch: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}
