use serde::Serialize;
use serde_json::json;

use packetflow_core::api::{
    AppConfig, CheckpointStore, CliError, CompletionRegistry, Manifest, MergeState,
    MergeStateStore, Round,
};

use crate::app;
use crate::commands::cli::{Args, ManifestDirArgs, OutputFormat};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrackState {
    Complete {
        final_commit: String,
    },
    InProgress {
        last_completed_task: String,
        next_task: Option<String>,
    },
    Ready,
    Waiting {
        on: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackLine {
    pub track: String,
    pub round: usize,
    #[serde(flatten)]
    pub state: TrackState,
}

pub fn handle(args: &Args, s: &ManifestDirArgs, cfg: AppConfig) -> Result<i32, CliError> {
    let (manifest, rounds) = app::load_manifest(&s.manifest_dir)?;

    let registry = CompletionRegistry::new(cfg.completion_dir(&manifest.root));
    let checkpoints = CheckpointStore::new(cfg.checkpoint_dir(&manifest.root));
    let merge = MergeStateStore::in_dir(&cfg.state_dir(&manifest.root)).load()?;

    let lines = collect(&manifest, &rounds, &registry, &checkpoints)?;
    match args.format {
        OutputFormat::Jsonl => {
            for line in &lines {
                println!("{}", json!(line));
            }
            if let Some(state) = &merge {
                println!("{}", json!({ "merge": state }));
            }
        }
        OutputFormat::Text => {
            println!("feature {}", manifest.feature_id);
            for line in &lines {
                println!("  {}", describe(line));
            }
            println!("{}", describe_merge(merge.as_ref(), rounds.len()));
        }
    }
    Ok(0)
}

pub fn collect(
    manifest: &Manifest,
    rounds: &[Round],
    registry: &CompletionRegistry,
    checkpoints: &CheckpointStore,
) -> Result<Vec<TrackLine>, CliError> {
    let done = registry.completed_ids()?;
    let mut lines = Vec::with_capacity(manifest.tracks.len());

    for round in rounds {
        for id in &round.tracks {
            let Some(track) = manifest.track(id) else {
                continue;
            };
            let state = if let Some(marker) = registry.marker(id)? {
                TrackState::Complete {
                    final_commit: marker.final_commit_ref,
                }
            } else if let Some(cp) = checkpoints.load(id)? {
                TrackState::InProgress {
                    last_completed_task: cp.last_completed_task_id,
                    next_task: cp.next_task_id,
                }
            } else {
                let on: Vec<String> = track
                    .depends_on
                    .iter()
                    .filter(|d| !done.contains(d.as_str()))
                    .cloned()
                    .collect();
                if on.is_empty() {
                    TrackState::Ready
                } else {
                    TrackState::Waiting { on }
                }
            };
            lines.push(TrackLine {
                track: id.clone(),
                round: round.number(),
                state,
            });
        }
    }
    Ok(lines)
}

fn describe(line: &TrackLine) -> String {
    let state = match &line.state {
        TrackState::Complete { final_commit } => format!("complete ({final_commit})"),
        TrackState::InProgress {
            last_completed_task,
            next_task: Some(next),
        } => format!("in progress (done through {last_completed_task}, next {next})"),
        TrackState::InProgress {
            last_completed_task,
            next_task: None,
        } => format!("in progress (all tasks done through {last_completed_task}, not marked complete)"),
        TrackState::Ready => "ready".to_string(),
        TrackState::Waiting { on } => format!("waiting on {}", on.join(", ")),
    };
    format!("[round {}] {}: {}", line.round, line.track, state)
}

fn describe_merge(state: Option<&MergeState>, total_rounds: usize) -> String {
    match state {
        None => "merge: not started".to_string(),
        Some(s) => match &s.pending {
            Some(p) => format!(
                "merge: {}/{} rounds passed, suspended at {} (run merge --continue)",
                s.rounds_passed,
                total_rounds,
                p.describe()
            ),
            None => format!("merge: {}/{} rounds passed", s.rounds_passed, total_rounds),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packetflow_core::api::{order, Checkpoint, CompletionMarker};
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = r#"{
        "formatVersion": 1,
        "feature": "checkout",
        "mergeStrategy": "merge",
        "tracks": [
            {"id": "A", "name": "a", "packet": "p/A.json", "worktree": "wt/A", "branch": "t/A"},
            {"id": "B", "name": "b", "packet": "p/B.json", "worktree": "wt/B", "branch": "t/B"},
            {"id": "C", "name": "c", "packet": "p/C.json", "worktree": "wt/C", "branch": "t/C", "dependsOn": ["A"]},
            {"id": "D", "name": "d", "packet": "p/D.json", "worktree": "wt/D", "branch": "t/D", "dependsOn": ["B"]}
        ]
    }"#;

    #[test]
    fn reports_each_track_state() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = packetflow_core::manifest::parse(MANIFEST, dir.path()).unwrap();
        let rounds = order(&manifest.tracks).unwrap();
        let registry = CompletionRegistry::new(dir.path().join("completed"));
        let checkpoints = CheckpointStore::new(dir.path().join("checkpoints"));

        registry
            .mark_complete("A", &CompletionMarker::new("A", "abc123"))
            .unwrap();
        checkpoints
            .save(&Checkpoint::new("B", "1", "def456", Some("2".into())))
            .unwrap();

        let lines = collect(&manifest, &rounds, &registry, &checkpoints).unwrap();
        let states: Vec<(&str, &TrackState)> =
            lines.iter().map(|l| (l.track.as_str(), &l.state)).collect();
        assert_eq!(
            states,
            vec![
                (
                    "A",
                    &TrackState::Complete {
                        final_commit: "abc123".into()
                    }
                ),
                (
                    "B",
                    &TrackState::InProgress {
                        last_completed_task: "1".into(),
                        next_task: Some("2".into())
                    }
                ),
                ("C", &TrackState::Ready),
                ("D", &TrackState::Waiting { on: vec!["B".into()] }),
            ]
        );
        assert_eq!(describe(&lines[3]), "[round 2] D: waiting on B");
    }

    #[test]
    fn merge_line_mentions_continue_when_suspended() {
        assert_eq!(describe_merge(None, 2), "merge: not started");
        let mut state = MergeState::new("checkout");
        state.rounds_passed = 1;
        state.pending = Some(packetflow_core::api::PendingEscalation::GateFailure {
            round: 2,
            gate: "tests".into(),
            summary: "exit 1".into(),
        });
        assert_eq!(
            describe_merge(Some(&state), 2),
            "merge: 1/2 rounds passed, suspended at round 2: gate 'tests' failed (run merge --continue)"
        );
    }
}
