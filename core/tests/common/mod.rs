#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use packetflow_core::api::{
    CheckpointStore, CompletionRegistry, GateReport, GateRunner, IntegrationOutcome, Integrator,
    Manifest, MergeStateStore, MergeStrategy, ResumePolicy, Task, TaskContext, TaskEvidence,
    TaskExecutor, TaskOutcome, Track, TrackExecutor, TrackOptions, Workspace,
};

/// A feature directory on disk: manifest, packets and state dirs.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub manifest: Arc<Manifest>,
}

/// `tracks` is `(id, depends_on, task_count)`.
pub fn fixture(tracks: &[(&str, &[&str], usize)], gates: &[&str]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let mut entries = Vec::new();
    for (id, deps, task_count) in tracks {
        let tasks: Vec<_> = (1..=*task_count)
            .map(|n| {
                json!({
                    "id": n.to_string(),
                    "description": format!("{id} step {n}"),
                    "targetFiles": [format!("src/{id}_{n}.rs")],
                    "acceptanceCriteria": ["tests pass"],
                })
            })
            .collect();
        let packet = json!({ "formatVersion": 1, "track": id, "tasks": tasks });
        std::fs::create_dir_all(root.join("packets")).unwrap();
        std::fs::write(
            root.join(format!("packets/{id}.json")),
            serde_json::to_string_pretty(&packet).unwrap(),
        )
        .unwrap();

        entries.push(json!({
            "id": id,
            "name": format!("track {id}"),
            "packet": format!("packets/{id}.json"),
            "worktree": format!("wt/{id}"),
            "branch": format!("track/{id}"),
            "dependsOn": deps,
        }));
    }

    let manifest = json!({
        "formatVersion": 1,
        "feature": "checkout",
        "tracks": entries,
        "mergeStrategy": "merge",
        "postMergeQA": gates,
    });
    std::fs::write(
        root.join("manifest.json"),
        serde_json::to_string_pretty(&manifest).unwrap(),
    )
    .unwrap();

    let manifest = packetflow_core::manifest::load(root).unwrap();
    Fixture {
        dir,
        manifest: Arc::new(manifest),
    }
}

impl Fixture {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn checkpoints(&self) -> CheckpointStore {
        CheckpointStore::new(self.root().join(".packetflow/checkpoints"))
    }

    pub fn registry(&self) -> CompletionRegistry {
        CompletionRegistry::new(self.root().join(".packetflow/completed"))
            .with_poll_interval(Duration::from_millis(5))
    }

    pub fn merge_store(&self) -> MergeStateStore {
        MergeStateStore::in_dir(&self.root().join(".packetflow"))
    }

    pub fn executor(&self, tasks: Arc<FakeTaskExecutor>, resume: ResumePolicy) -> TrackExecutor {
        TrackExecutor::new(
            self.manifest.clone(),
            self.checkpoints(),
            self.registry(),
            tasks,
            Arc::new(FakeWorkspace::default()),
        )
        .with_options(TrackOptions {
            resume,
            dependency_timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(5),
            max_attempts: 2,
        })
    }
}

/// Accepts every task with red evidence unless told otherwise. Records each
/// attempt as `track/task`.
#[derive(Default)]
pub struct FakeTaskExecutor {
    pub calls: Mutex<Vec<String>>,
    /// `track/task` keys that are always rejected.
    pub reject: Mutex<HashSet<String>>,
    /// `track/task` keys accepted without an observed red step.
    pub skip_red: Mutex<HashSet<String>>,
}

impl FakeTaskExecutor {
    pub fn rejecting(keys: &[&str]) -> Self {
        let fake = Self::default();
        fake.reject
            .lock()
            .unwrap()
            .extend(keys.iter().map(|k| k.to_string()));
        fake
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskExecutor for FakeTaskExecutor {
    fn name(&self) -> &str {
        "fake"
    }

    async fn attempt(&self, task: &Task, ctx: &TaskContext) -> anyhow::Result<TaskOutcome> {
        let key = format!("{}/{}", ctx.track_id, task.id);
        self.calls.lock().unwrap().push(key.clone());

        if self.reject.lock().unwrap().contains(&key) {
            return Ok(TaskOutcome::Rejected {
                reason: "verification still failing".into(),
            });
        }
        let red_observed = !self.skip_red.lock().unwrap().contains(&key);
        Ok(TaskOutcome::Accepted(TaskEvidence {
            red_observed,
            commit_ref: format!("c-{}-{}", ctx.track_id, task.id),
            notes: None,
        }))
    }
}

/// Reports `track/<dir name>` as the branch of every worktree unless overridden.
#[derive(Default)]
pub struct FakeWorkspace {
    pub branches: HashMap<PathBuf, String>,
}

#[async_trait]
impl Workspace for FakeWorkspace {
    async fn current_branch(&self, worktree: &Path) -> anyhow::Result<String> {
        if let Some(b) = self.branches.get(worktree) {
            return Ok(b.clone());
        }
        let name = worktree
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(format!("track/{name}"))
    }

    async fn head_commit(&self, worktree: &Path) -> anyhow::Result<String> {
        Ok(format!("head-{}", worktree.display()))
    }
}

/// Shared, ordered log of integration and gate calls.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub struct FakeIntegrator {
    pub log: CallLog,
    /// Track id -> conflicting paths on first integration.
    pub conflicts: Mutex<HashMap<String, Vec<String>>>,
}

impl FakeIntegrator {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            conflicts: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Integrator for FakeIntegrator {
    fn name(&self) -> &str {
        "fake"
    }

    async fn integrate(
        &self,
        track: &Track,
        _strategy: MergeStrategy,
    ) -> anyhow::Result<IntegrationOutcome> {
        self.log
            .lock()
            .unwrap()
            .push(format!("integrate:{}", track.id));
        if let Some(paths) = self.conflicts.lock().unwrap().get(&track.id) {
            return Ok(IntegrationOutcome::Conflict {
                paths: paths.clone(),
            });
        }
        Ok(IntegrationOutcome::Clean {
            commit: format!("m-{}", track.id),
        })
    }

    async fn conclude(
        &self,
        track: &Track,
        _strategy: MergeStrategy,
    ) -> anyhow::Result<IntegrationOutcome> {
        self.log
            .lock()
            .unwrap()
            .push(format!("conclude:{}", track.id));
        Ok(IntegrationOutcome::Clean {
            commit: format!("m-{}-resolved", track.id),
        })
    }
}

/// Passes every gate unless its id is in `failing`.
pub struct FakeGates {
    pub log: CallLog,
    pub failing: Mutex<HashSet<String>>,
}

impl FakeGates {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failing: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl GateRunner for FakeGates {
    async fn run_gate(&self, gate: &str) -> anyhow::Result<GateReport> {
        self.log.lock().unwrap().push(format!("gate:{gate}"));
        let passed = !self.failing.lock().unwrap().contains(gate);
        Ok(GateReport {
            passed,
            summary: if passed { "ok".into() } else { "1 test failed".into() },
        })
    }
}

pub fn mark_done(registry: &CompletionRegistry, ids: &[&str]) {
    use packetflow_core::api::CompletionMarker;
    for id in ids {
        registry
            .mark_complete(id, &CompletionMarker::new(*id, format!("c-{id}")))
            .unwrap();
    }
}
