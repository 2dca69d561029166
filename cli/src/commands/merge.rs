use packetflow_core::api::{AppConfig, CliError, MergeMode};

use crate::app;
use crate::commands::cli::{Args, MergeArgs};

pub async fn handle(args: &Args, m: &MergeArgs, cfg: AppConfig) -> Result<i32, CliError> {
    let (manifest, _rounds) = app::load_manifest(&m.manifest_dir)?;

    let missing = cfg.missing_gates(&manifest.post_merge_qa);
    if !missing.is_empty() {
        return Err(CliError::Config(format!(
            "postMergeQA gate(s) {} have no command under [gates]",
            missing.join(", ")
        )));
    }

    let mode = if m.continue_merge {
        MergeMode::Continue
    } else {
        MergeMode::Start
    };

    let ctx = app::context(cfg, manifest, args).await?;
    let report = ctx.merge_orchestrator().run(mode).await?;
    tracing::info!(
        rounds = report.rounds_merged,
        total = report.total_rounds,
        integrated = ?report.integrated,
        "merge complete"
    );
    Ok(0)
}
