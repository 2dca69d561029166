use packetflow_core::api::{AppConfig, CliError};

use crate::app;
use crate::commands::cli::{Args, ManifestDirArgs};

/// Exit code follows the first failed track; every failure is logged.
pub async fn handle(args: &Args, ra: &ManifestDirArgs, cfg: AppConfig) -> Result<i32, CliError> {
    app::require_task_commands(&cfg)?;
    let (manifest, _rounds) = app::load_manifest(&ra.manifest_dir)?;

    let ctx = app::context(cfg, manifest, args).await?;
    let summary = ctx.engine().run_all().await?;

    if summary.is_success() {
        tracing::info!(
            run_id = %summary.run_id,
            completed = summary.completed.len(),
            duration_ms = summary.duration_ms,
            "all tracks complete"
        );
        return Ok(0);
    }

    for failure in &summary.failed {
        tracing::error!(
            track = %failure.track_id,
            round = failure.round,
            error = %failure.error,
            "track failed"
        );
    }
    match summary.failed.into_iter().next() {
        Some(first) => Err(first.error.into()),
        None => Ok(0),
    }
}
