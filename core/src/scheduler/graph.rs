use std::collections::{HashMap, HashSet};

use crate::error::{CycleError, ScheduleError};
use crate::manifest::Schedulable;

use super::Round;

/// Track dependency graph (DAG)
#[derive(Debug, Clone)]
pub struct TrackGraph<T: Schedulable> {
    /// Nodes: track_id -> item
    pub nodes: HashMap<String, T>,

    /// Dependency edges: track_id -> tracks it depends on
    pub edges: HashMap<String, Vec<String>>,

    /// Reverse edges: track_id -> tracks that depend on it
    pub reverse_edges: HashMap<String, Vec<String>>,

    /// Manifest order, used to keep round membership listed stably
    insertion_order: Vec<String>,
    position: HashMap<String, usize>,
}

impl<T: Schedulable> TrackGraph<T> {
    /// Construct the graph from an ordered item list
    pub fn from_items(items: &[T]) -> Result<Self, ScheduleError> {
        let mut nodes = HashMap::new();
        let mut edges = HashMap::new();
        let mut reverse_edges: HashMap<String, Vec<String>> = HashMap::new();
        let mut insertion_order = Vec::new();
        let mut position = HashMap::new();

        for item in items {
            if nodes.contains_key(item.id()) {
                return Err(ScheduleError::DuplicateTrackId(item.id().to_string()));
            }

            let id = item.id().to_string();
            let mut deps: Vec<String> = Vec::new();
            for dep in item.dependencies() {
                if !deps.iter().any(|d| d == dep) {
                    deps.push(dep.to_string());
                }
            }

            for dep in &deps {
                reverse_edges.entry(dep.clone()).or_default().push(id.clone());
            }

            position.insert(id.clone(), insertion_order.len());
            insertion_order.push(id.clone());
            edges.insert(id.clone(), deps);
            nodes.insert(id, item.clone());
        }

        Ok(Self {
            nodes,
            edges,
            reverse_edges,
            insertion_order,
            position,
        })
    }

    /// Check every dependency resolves to a node
    pub fn validate(&self) -> Result<(), ScheduleError> {
        for id in &self.insertion_order {
            for dep in &self.edges[id] {
                if !self.nodes.contains_key(dep) {
                    return Err(ScheduleError::DependencyNotFound {
                        track: id.clone(),
                        missing: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Kahn-style topological sort into rounds.
    ///
    /// Each round holds every track whose dependencies all sit in earlier
    /// rounds. Members of one round are independent of each other.
    ///
    /// # Time Complexity
    ///
    /// O(V + E) plus the per-round ordering sort
    pub fn rounds(&self) -> Result<Vec<Round>, ScheduleError> {
        self.validate()?;

        // edges[A] = [B, C] means A depends on B and C, so A's in-degree is 2
        let mut in_degree: HashMap<&str, usize> = self
            .edges
            .iter()
            .map(|(id, deps)| (id.as_str(), deps.len()))
            .collect();

        let mut current: Vec<String> = self
            .insertion_order
            .iter()
            .filter(|id| in_degree[id.as_str()] == 0)
            .cloned()
            .collect();

        let mut rounds = Vec::new();
        let mut processed = 0;

        while !current.is_empty() {
            processed += current.len();

            let mut next = Vec::new();
            for id in &current {
                if let Some(dependents) = self.reverse_edges.get(id) {
                    for dependent in dependents {
                        if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                            *degree -= 1;
                            if *degree == 0 {
                                next.push(dependent.clone());
                            }
                        }
                    }
                }
            }
            self.sort_stable(&mut next);

            rounds.push(Round {
                index: rounds.len(),
                tracks: std::mem::replace(&mut current, next),
            });
        }

        if processed != self.nodes.len() {
            let remaining: HashSet<&str> = in_degree
                .iter()
                .filter(|(_, &d)| d > 0)
                .map(|(id, _)| *id)
                .collect();
            let cycle = self
                .find_cycle(&remaining)
                .unwrap_or_else(|| self.ordered(remaining.iter().copied()));
            return Err(CycleError { cycle }.into());
        }

        Ok(rounds)
    }

    /// DFS over the unscheduled nodes, returning the first cycle found in
    /// dependency order. Starting points follow manifest order so the report is
    /// the same across runs.
    fn find_cycle(&self, remaining: &HashSet<&str>) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for id in &self.insertion_order {
            if remaining.contains(id.as_str())
                && !visited.contains(id.as_str())
                && self.dfs_cycle(id, remaining, &mut visited, &mut stack)
            {
                return Some(stack);
            }
        }

        None
    }

    fn dfs_cycle<'a>(
        &'a self,
        node: &'a str,
        remaining: &HashSet<&str>,
        visited: &mut HashSet<&'a str>,
        stack: &mut Vec<String>,
    ) -> bool {
        visited.insert(node);
        stack.push(node.to_string());

        if let Some(deps) = self.edges.get(node) {
            for dep in deps {
                if !remaining.contains(dep.as_str()) {
                    continue;
                }

                // Dependency already on the current path: the cycle is the path from it
                if let Some(pos) = stack.iter().position(|x| x == dep) {
                    *stack = stack[pos..].to_vec();
                    return true;
                }

                if !visited.contains(dep.as_str())
                    && self.dfs_cycle(dep, remaining, visited, stack)
                {
                    return true;
                }
            }
        }

        stack.pop();
        false
    }

    fn sort_stable(&self, ids: &mut [String]) {
        ids.sort_by_key(|id| self.position.get(id).copied().unwrap_or(usize::MAX));
    }

    fn ordered<'a>(&self, ids: impl Iterator<Item = &'a str>) -> Vec<String> {
        let mut v: Vec<String> = ids.map(str::to_string).collect();
        self.sort_stable(&mut v);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Track;
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

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = TrackGraph::from_items(&[t("A", &[]), t("A", &[])]).unwrap_err();
        assert!(matches!(err, ScheduleError::DuplicateTrackId(id) if id == "A"));
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let g = TrackGraph::from_items(&[t("A", &["Q"])]).unwrap();
        let err = g.rounds().unwrap_err();
        assert!(matches!(err, ScheduleError::DependencyNotFound { .. }));
    }

    #[test]
    fn self_dependency_is_a_cycle_of_one() {
        let g = TrackGraph::from_items(&[t("A", &["A"])]).unwrap();
        match g.rounds().unwrap_err() {
            ScheduleError::Cycle(c) => assert_eq!(c.cycle, vec!["A".to_string()]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn cycle_behind_acyclic_prefix_is_found() {
        let g = TrackGraph::from_items(&[
            t("root", &[]),
            t("X", &["root", "Z"]),
            t("Y", &["X"]),
            t("Z", &["Y"]),
        ])
        .unwrap();
        match g.rounds().unwrap_err() {
            ScheduleError::Cycle(c) => {
                assert_eq!(c.cycle, vec!["X".to_string(), "Z".into(), "Y".into()])
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn round_members_follow_manifest_order() {
        let g = TrackGraph::from_items(&[t("C", &[]), t("A", &[]), t("B", &["C", "A"])]).unwrap();
        let rounds = g.rounds().unwrap();
        assert_eq!(rounds[0].tracks, vec!["C".to_string(), "A".to_string()]);
        assert_eq!(rounds[1].tracks, vec!["B".to_string()]);
        assert_eq!(rounds[1].number(), 2);
    }
}
