use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use crate::error::ManifestError;
use crate::util::file_key;

use super::types::{
    Manifest, MergeStrategy, RawManifest, RawTrack, Track, SUPPORTED_FORMAT_VERSION,
};

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Load a manifest from a `manifest.json` path or from the directory holding it.
pub fn load(source: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let source = source.as_ref();
    let path = if source.is_dir() {
        source.join(MANIFEST_FILE_NAME)
    } else {
        source.to_path_buf()
    };

    let json = std::fs::read_to_string(&path).map_err(|e| ManifestError::Read {
        path: path.clone(),
        source: e,
    })?;

    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let manifest = parse(&json, root)?;
    tracing::debug!(
        feature = %manifest.feature_id,
        tracks = manifest.tracks.len(),
        path = %path.display(),
        "manifest loaded"
    );
    Ok(manifest)
}

/// Parse and validate manifest JSON. `root` anchors relative packet/worktree refs.
pub fn parse(json: &str, root: impl Into<PathBuf>) -> Result<Manifest, ManifestError> {
    let raw: RawManifest = serde_json::from_str(json)
        .map_err(|e| ManifestError::MalformedManifest(format!("invalid JSON: {e}")))?;

    let format_version = raw
        .format_version
        .ok_or_else(|| missing("formatVersion"))?;
    if format_version != SUPPORTED_FORMAT_VERSION {
        return Err(ManifestError::MalformedManifest(format!(
            "unsupported formatVersion {format_version} (expected {SUPPORTED_FORMAT_VERSION})"
        )));
    }

    let feature_id = required_str(raw.feature, "feature")?;

    let merge_strategy_raw = required_str(raw.merge_strategy, "mergeStrategy")?;
    let merge_strategy = MergeStrategy::parse(&merge_strategy_raw).ok_or_else(|| {
        ManifestError::MalformedManifest(format!(
            "unknown mergeStrategy '{merge_strategy_raw}' (expected 'merge' or 'squash')"
        ))
    })?;

    let raw_tracks = raw.tracks.ok_or_else(|| missing("tracks"))?;
    if raw_tracks.is_empty() {
        return Err(ManifestError::MalformedManifest(
            "tracks must not be empty".to_string(),
        ));
    }

    let mut tracks = Vec::with_capacity(raw_tracks.len());
    for (idx, rt) in raw_tracks.into_iter().enumerate() {
        tracks.push(convert_track(idx, rt)?);
    }

    validate_tracks(&tracks)?;

    let mut post_merge_qa = Vec::with_capacity(raw.post_merge_qa.len());
    for gate in raw.post_merge_qa {
        let gate = gate.trim().to_string();
        if gate.is_empty() {
            return Err(ManifestError::MalformedManifest(
                "postMergeQA contains an empty gate id".to_string(),
            ));
        }
        post_merge_qa.push(gate);
    }

    Ok(Manifest {
        feature_id,
        format_version,
        tracks,
        merge_strategy,
        post_merge_qa,
        root: root.into(),
    })
}

/// No id collision, and every `dependsOn` entry resolves. Checked in manifest
/// order so the reported error is stable.
pub fn validate_tracks(tracks: &[Track]) -> Result<(), ManifestError> {
    let mut seen = HashSet::new();
    for t in tracks {
        if !seen.insert(t.id.as_str()) {
            return Err(ManifestError::MalformedManifest(format!(
                "duplicate track id '{}'",
                t.id
            )));
        }
    }

    for t in tracks {
        for dep in &t.depends_on {
            if !seen.contains(dep.as_str()) {
                return Err(ManifestError::UnknownDependency {
                    track: t.id.clone(),
                    missing: dep.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Find the track whose packet resolves to `packet`.
pub fn track_for_packet<'a>(
    manifest: &'a Manifest,
    packet: &Path,
) -> Result<&'a Track, ManifestError> {
    let wanted = normalize(packet);
    manifest
        .tracks
        .iter()
        .find(|t| normalize(&manifest.packet_path(t)) == wanted)
        .ok_or_else(|| ManifestError::PacketNotInManifest(packet.to_path_buf()))
}

/// Walk up from the packet's directory looking for a manifest.
pub fn find_manifest_dir(packet: &Path) -> Option<PathBuf> {
    let start = normalize(packet);
    start
        .ancestors()
        .skip(1)
        .find(|dir| dir.join(MANIFEST_FILE_NAME).is_file())
        .map(Path::to_path_buf)
}

fn normalize(p: &Path) -> PathBuf {
    std::fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf())
}

fn convert_track(idx: usize, rt: RawTrack) -> Result<Track, ManifestError> {
    let id = rt
        .id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| missing(&format!("tracks[{idx}].id")))?;
    if file_key(&id).is_err() {
        return Err(ManifestError::MalformedManifest(format!(
            "tracks[{idx}].id '{id}' may only contain [A-Za-z0-9._-] and must not start with '.'"
        )));
    }
    let field = |name: &str| format!("tracks[{idx}] ('{id}').{name}");

    let name = rt
        .name
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| id.clone());
    let packet = required_str(rt.packet, &field("packet"))?;
    let worktree = required_str(rt.worktree, &field("worktree"))?;
    let branch = required_str(rt.branch, &field("branch"))?;

    let mut depends_on = BTreeSet::new();
    for dep in rt.depends_on {
        let dep = dep.trim().to_string();
        if dep.is_empty() {
            return Err(ManifestError::MalformedManifest(format!(
                "{} contains an empty id",
                field("dependsOn")
            )));
        }
        depends_on.insert(dep);
    }

    Ok(Track {
        id,
        name,
        packet_ref: PathBuf::from(packet),
        worktree_ref: PathBuf::from(worktree),
        branch_name: branch,
        depends_on,
    })
}

fn required_str(v: Option<String>, field: &str) -> Result<String, ManifestError> {
    v.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| missing(field))
}

fn missing(field: &str) -> ManifestError {
    ManifestError::MalformedManifest(format!("missing required field '{field}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExitCode;
    use pretty_assertions::assert_eq;

    const VALID: &str = r#"{
        "formatVersion": 1,
        "feature": "checkout-v2",
        "mergeStrategy": "merge",
        "postMergeQA": ["tests", "lint"],
        "tracks": [
            {"id": "A", "name": "api", "packet": "packets/a.json", "worktree": "../wt-a", "branch": "feat/a", "dependsOn": []},
            {"id": "B", "name": "ui", "packet": "packets/b.json", "worktree": "../wt-b", "branch": "feat/b", "dependsOn": ["A"]}
        ]
    }"#;

    #[test]
    fn parses_valid_manifest() {
        let m = parse(VALID, "/tmp/feature").unwrap();
        assert_eq!(m.feature_id, "checkout-v2");
        assert_eq!(m.track_ids(), vec!["A", "B"]);
        assert_eq!(m.post_merge_qa, vec!["tests".to_string(), "lint".to_string()]);
        assert_eq!(m.merge_strategy, MergeStrategy::Merge);
        let b = m.track("B").unwrap();
        assert!(b.depends_on.contains("A"));
        assert_eq!(b.branch_name, "feat/b");
    }

    #[test]
    fn missing_field_is_malformed() {
        let json = VALID.replace(r#""branch": "feat/b", "#, "");
        let err = parse(&json, "/tmp").unwrap_err();
        match err {
            ManifestError::MalformedManifest(msg) => assert!(msg.contains("branch"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn track_id_must_be_usable_as_a_file_name() {
        for bad in ["feat/api", "../A", ".hidden", "a b"] {
            let json = VALID
                .replace(r#""id": "A""#, &format!(r#""id": "{bad}""#))
                .replace(r#""dependsOn": ["A"]"#, &format!(r#""dependsOn": ["{bad}"]"#));
            let err = parse(&json, "/tmp").unwrap_err();
            assert_eq!(err.exit_code(), ExitCode::ValidationError);
            match err {
                ManifestError::MalformedManifest(msg) => {
                    assert!(msg.contains("tracks[0].id"), "{msg}")
                }
                other => panic!("{bad}: unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_dependency_is_reported() {
        let json = VALID.replace(r#""dependsOn": ["A"]"#, r#""dependsOn": ["Z"]"#);
        let err = parse(&json, "/tmp").unwrap_err();
        match err {
            ManifestError::UnknownDependency { track, missing } => {
                assert_eq!(track, "B");
                assert_eq!(missing, "Z");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_id_is_malformed() {
        let json = VALID.replace(r#""id": "B""#, r#""id": "A""#);
        let err = parse(&json, "/tmp").unwrap_err();
        assert!(matches!(err, ManifestError::MalformedManifest(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn unsupported_version_and_strategy_are_rejected() {
        let json = VALID.replace(r#""formatVersion": 1"#, r#""formatVersion": 9"#);
        assert!(parse(&json, "/tmp").is_err());
        let json = VALID.replace(r#""mergeStrategy": "merge""#, r#""mergeStrategy": "rebase-all""#);
        assert!(parse(&json, "/tmp").is_err());
    }

    #[test]
    fn load_from_directory_and_find_packet_track() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("packets")).unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE_NAME), VALID).unwrap();
        std::fs::write(dir.path().join("packets/b.json"), "{}").unwrap();

        let m = load(dir.path()).unwrap();
        let t = track_for_packet(&m, &dir.path().join("packets/b.json")).unwrap();
        assert_eq!(t.id, "B");

        let found = find_manifest_dir(&dir.path().join("packets/b.json")).unwrap();
        assert_eq!(
            std::fs::canonicalize(found).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }
}
