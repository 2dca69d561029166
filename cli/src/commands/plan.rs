use serde_json::json;

use packetflow_core::api::{CliError, Manifest, Round};

use crate::app;
use crate::commands::cli::{Args, ManifestDirArgs, OutputFormat};

pub fn handle(args: &Args, p: &ManifestDirArgs) -> Result<i32, CliError> {
    let (manifest, rounds) = app::load_manifest(&p.manifest_dir)?;
    for line in render(&manifest, &rounds, args.format) {
        println!("{line}");
    }
    Ok(0)
}

pub fn render(manifest: &Manifest, rounds: &[Round], format: OutputFormat) -> Vec<String> {
    match format {
        OutputFormat::Jsonl => rounds
            .iter()
            .map(|r| json!({ "round": r.number(), "tracks": r.tracks }).to_string())
            .collect(),
        OutputFormat::Text => {
            let mut out = vec![format!(
                "feature {}: {} tracks in {} rounds (merge strategy: {})",
                manifest.feature_id,
                manifest.tracks.len(),
                rounds.len(),
                manifest.merge_strategy.as_str()
            )];
            out.extend(
                rounds
                    .iter()
                    .map(|r| format!("round {}: {}", r.number(), r.tracks.join(", "))),
            );
            if !manifest.post_merge_qa.is_empty() {
                out.push(format!("gates: {}", manifest.post_merge_qa.join(", ")));
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packetflow_core::api::order;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = r#"{
        "formatVersion": 1,
        "feature": "checkout",
        "mergeStrategy": "squash",
        "postMergeQA": ["tests"],
        "tracks": [
            {"id": "A", "name": "a", "packet": "p/A.json", "worktree": "wt/A", "branch": "t/A", "dependsOn": []},
            {"id": "B", "name": "b", "packet": "p/B.json", "worktree": "wt/B", "branch": "t/B", "dependsOn": ["A"]},
            {"id": "C", "name": "c", "packet": "p/C.json", "worktree": "wt/C", "branch": "t/C", "dependsOn": ["A"]},
            {"id": "D", "name": "d", "packet": "p/D.json", "worktree": "wt/D", "branch": "t/D", "dependsOn": ["B", "C"]}
        ]
    }"#;

    #[test]
    fn text_plan_lists_rounds() {
        let manifest = packetflow_core::manifest::parse(MANIFEST, ".").unwrap();
        let rounds = order(&manifest.tracks).unwrap();
        assert_eq!(
            render(&manifest, &rounds, OutputFormat::Text),
            vec![
                "feature checkout: 4 tracks in 3 rounds (merge strategy: squash)",
                "round 1: A",
                "round 2: B, C",
                "round 3: D",
                "gates: tests",
            ]
        );
    }

    #[test]
    fn jsonl_plan_is_one_round_per_line() {
        let manifest = packetflow_core::manifest::parse(MANIFEST, ".").unwrap();
        let rounds = order(&manifest.tracks).unwrap();
        let lines = render(&manifest, &rounds, OutputFormat::Jsonl);
        assert_eq!(lines.len(), 3);
        let second: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(second["round"], 2);
        assert_eq!(second["tracks"], json!(["B", "C"]));
    }
}
