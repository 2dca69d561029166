use packetflow_core::api::{
    find_manifest_dir, track_for_packet, AppConfig, CliError, ManifestError, ResumePolicy,
    TrackReport, TrackStatus,
};

use crate::app;
use crate::commands::cli::{Args, RunTrackArgs};

pub async fn handle(args: &Args, rt: &RunTrackArgs, cfg: AppConfig) -> Result<i32, CliError> {
    app::require_task_commands(&cfg)?;

    let manifest_dir = match &rt.manifest_dir {
        Some(dir) => dir.clone(),
        None => find_manifest_dir(&rt.packet)
            .ok_or_else(|| ManifestError::PacketNotInManifest(rt.packet.clone()))?,
    };
    let (manifest, _rounds) = app::load_manifest(&manifest_dir)?;
    let track_id = track_for_packet(&manifest, &rt.packet)?.id.clone();

    let resume = if rt.resume {
        ResumePolicy::Resume
    } else {
        ResumePolicy::Refuse
    };

    let ctx = app::context(cfg, manifest, args).await?;
    let report = ctx.track_executor(resume).run(&track_id).await?;

    match report.status {
        TrackStatus::AlreadyComplete => {
            tracing::info!(track = %track_id, "track already complete, nothing to do");
        }
        TrackStatus::Completed => {
            tracing::info!(
                track = %track_id,
                executed = report.executed.len(),
                skipped = report.skipped.len(),
                final_commit = final_commit(&report),
                "track complete"
            );
        }
    }
    Ok(0)
}

fn final_commit(report: &TrackReport) -> &str {
    report.final_commit.as_deref().unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(final_commit: Option<&str>) -> TrackReport {
        TrackReport {
            track_id: "A".into(),
            status: TrackStatus::Completed,
            executed: vec!["1".into()],
            skipped: Vec::new(),
            final_commit: final_commit.map(str::to_string),
        }
    }

    #[test]
    fn final_commit_falls_back_to_dash() {
        assert_eq!(final_commit(&report(Some("abc123"))), "abc123");
        assert_eq!(final_commit(&report(None)), "-");
    }
}
