use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;

use super::types::{Manifest, Track, SUPPORTED_FORMAT_VERSION};

/// One unit of work inside a track packet. Consumed in order by the track executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub target_files: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPacket {
    format_version: Option<u32>,
    track: Option<String>,
    tasks: Option<Vec<Task>>,
}

/// Read and validate the task list of `track`.
pub fn load_packet(manifest: &Manifest, track: &Track) -> Result<Vec<Task>, ManifestError> {
    let path = manifest.packet_path(track);
    let json = std::fs::read_to_string(&path).map_err(|e| ManifestError::Read {
        path: path.clone(),
        source: e,
    })?;
    parse_packet(track, &json)
}

pub fn parse_packet(track: &Track, json: &str) -> Result<Vec<Task>, ManifestError> {
    let malformed = |reason: String| ManifestError::MalformedPacket {
        track: track.id.clone(),
        reason,
    };

    let raw: RawPacket =
        serde_json::from_str(json).map_err(|e| malformed(format!("invalid JSON: {e}")))?;

    if let Some(v) = raw.format_version {
        if v != SUPPORTED_FORMAT_VERSION {
            return Err(malformed(format!("unsupported formatVersion {v}")));
        }
    }

    if let Some(owner) = raw.track.as_deref() {
        if owner != track.id {
            return Err(malformed(format!("packet belongs to track '{owner}'")));
        }
    }

    let tasks = raw
        .tasks
        .ok_or_else(|| malformed("missing required field 'tasks'".to_string()))?;
    if tasks.is_empty() {
        return Err(malformed("tasks must not be empty".to_string()));
    }

    let mut seen = HashSet::new();
    for task in &tasks {
        if task.id.trim().is_empty() {
            return Err(malformed("task with empty id".to_string()));
        }
        if !seen.insert(task.id.as_str()) {
            return Err(malformed(format!("duplicate task id '{}'", task.id)));
        }
    }

    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn track(id: &str) -> Track {
        Track {
            id: id.into(),
            name: id.into(),
            packet_ref: PathBuf::from("p.json"),
            worktree_ref: PathBuf::from("wt"),
            branch_name: "b".into(),
            depends_on: BTreeSet::new(),
        }
    }

    #[test]
    fn keeps_task_order() {
        let json = r#"{"formatVersion":1,"track":"T","tasks":[
            {"id":"1","description":"model","targetFiles":["src/model.rs"],"acceptanceCriteria":["compiles"]},
            {"id":"2","description":"api"}
        ]}"#;
        let tasks = parse_packet(&track("T"), json).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "1");
        assert_eq!(tasks[0].target_files, vec!["src/model.rs".to_string()]);
        assert!(tasks[1].acceptance_criteria.is_empty());
    }

    #[test]
    fn rejects_foreign_or_duplicate_tasks() {
        let foreign = r#"{"track":"X","tasks":[{"id":"1","description":"d"}]}"#;
        assert!(parse_packet(&track("T"), foreign).is_err());

        let dup = r#"{"tasks":[{"id":"1","description":"d"},{"id":"1","description":"e"}]}"#;
        let err = parse_packet(&track("T"), dup).unwrap_err();
        assert!(err.to_string().contains("duplicate task id"));

        let empty = r#"{"tasks":[]}"#;
        assert!(parse_packet(&track("T"), empty).is_err());
    }
}
