//! Dependency scheduler: turns the track graph into dependency-ordered rounds.
//!
//! ```text
//! Manifest.tracks
//!   ↓
//! TrackGraph::from_items()   → duplicate ids
//!   ↓
//! TrackGraph::rounds()       → dangling refs, cycles (with the cycle path)
//!   ↓
//! Vec<Round>                 → run / merge round by round
//! ```
//!
//! Rounds are never persisted. They are recomputed on every run from the
//! manifest, and for pending work, from the set of completed tracks.

mod graph;

use std::collections::HashSet;

use serde::Serialize;

use crate::error::ScheduleError;
use crate::manifest::{Manifest, Schedulable, Track};

pub use graph::TrackGraph;

/// A batch of mutually independent tracks whose dependencies are all satisfied
/// by earlier rounds. Members may run concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Round {
    pub index: usize,
    pub tracks: Vec<String>,
}

impl Round {
    /// 1-based number used in messages.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.tracks.iter().any(|t| t == track_id)
    }
}

/// Order every track of the graph into rounds.
pub fn order<T: Schedulable>(tracks: &[T]) -> Result<Vec<Round>, ScheduleError> {
    TrackGraph::from_items(tracks)?.rounds()
}

/// Rounds over the tracks that are not yet complete. Completed tracks count as
/// satisfied dependencies and do not appear in any round.
pub fn pending_rounds(
    manifest: &Manifest,
    completed: &HashSet<String>,
) -> Result<Vec<Round>, ScheduleError> {
    let pending: Vec<Track> = manifest
        .tracks
        .iter()
        .filter(|t| !completed.contains(&t.id))
        .map(|t| {
            let mut t = t.clone();
            t.depends_on.retain(|d| !completed.contains(d));
            t
        })
        .collect();

    order(&pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::MergeStrategy;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn t(id: &str, deps: &[&str]) -> Track {
        Track {
            id: id.into(),
            name: id.into(),
            packet_ref: PathBuf::from(format!("{id}.json")),
            worktree_ref: PathBuf::from(id),
            branch_name: format!("feat/{id}"),
            depends_on: deps.iter().map(|d| d.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    fn members(rounds: &[Round]) -> Vec<Vec<String>> {
        rounds
            .iter()
            .map(|r| {
                let mut m = r.tracks.clone();
                m.sort();
                m
            })
            .collect()
    }

    fn diamond() -> Vec<Track> {
        vec![
            t("A", &[]),
            t("B", &["A"]),
            t("C", &["A"]),
            t("D", &["B", "C"]),
        ]
    }

    #[test]
    fn diamond_orders_into_three_rounds() {
        let rounds = order(&diamond()).unwrap();
        assert_eq!(
            members(&rounds),
            vec![
                vec!["A".to_string()],
                vec!["B".to_string(), "C".to_string()],
                vec!["D".to_string()],
            ]
        );
    }

    #[test]
    fn two_cycle_reports_both_ids() {
        let err = order(&[t("A", &["B"]), t("B", &["A"])]).unwrap_err();
        match err {
            ScheduleError::Cycle(c) => assert_eq!(c.cycle, vec!["A".to_string(), "B".to_string()]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn membership_is_stable_across_runs() {
        let first = order(&diamond()).unwrap();
        for _ in 0..20 {
            assert_eq!(members(&order(&diamond()).unwrap()), members(&first));
        }
    }

    #[test]
    fn pending_rounds_skip_completed_tracks() {
        let manifest = Manifest {
            feature_id: "f".into(),
            format_version: 1,
            tracks: diamond(),
            merge_strategy: MergeStrategy::Merge,
            post_merge_qa: vec![],
            root: PathBuf::from("."),
        };
        let done: HashSet<String> = ["A".to_string(), "C".to_string()].into_iter().collect();
        let rounds = pending_rounds(&manifest, &done).unwrap();
        assert_eq!(
            members(&rounds),
            vec![vec!["B".to_string()], vec!["D".to_string()]]
        );
    }
}
