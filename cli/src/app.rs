//! Shared wiring for the subcommands: config, manifest, context.

use std::path::Path;

use packetflow_core::api::{
    load, load_default, load_from, order, AppConfig, AppContext, CliError,
    DependencyTimeoutPolicy, Manifest, Round, RunSettings,
};
use packetflow_plugins::services::PluginServicesFactory;

use crate::commands::cli::{Args, OnDependencyTimeout, OutputFormat};

pub fn load_config(args: &Args) -> Result<AppConfig, CliError> {
    let mut cfg = match &args.config {
        Some(path) => load_from(path),
        None => load_default(),
    }
    .map_err(|e| CliError::Config(format!("{e:#}")))?;

    if let Some(n) = args.max_parallel {
        cfg.scheduler.max_parallel = n;
    }
    cfg.validate().map_err(CliError::Config)?;
    Ok(cfg)
}

pub fn settings(args: &Args) -> RunSettings {
    RunSettings {
        format: args.format.as_str().to_string(),
        on_dependency_timeout: match args.on_dependency_timeout {
            OnDependencyTimeout::Wait => DependencyTimeoutPolicy::Wait,
            OnDependencyTimeout::Abort => DependencyTimeoutPolicy::Abort,
        },
        progress: args.progress && args.format == OutputFormat::Text,
    }
}

/// Load the manifest and reject cyclic graphs before anything runs.
pub fn load_manifest(dir: &Path) -> Result<(Manifest, Vec<Round>), CliError> {
    let manifest = load(dir)?;
    let rounds = order(&manifest.tracks)?;
    Ok((manifest, rounds))
}

/// Task execution needs both shell commands.
pub fn require_task_commands(cfg: &AppConfig) -> Result<(), CliError> {
    let commands = &cfg.executor.commands;
    let mut missing = Vec::new();
    if commands.verify.as_deref().map_or(true, |s| s.trim().is_empty()) {
        missing.push("executor.commands.verify");
    }
    if commands.implement.as_deref().map_or(true, |s| s.trim().is_empty()) {
        missing.push("executor.commands.implement");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CliError::Config(format!(
            "{} must be set to execute tasks",
            missing.join(" and ")
        )))
    }
}

pub async fn context(
    cfg: AppConfig,
    manifest: Manifest,
    args: &Args,
) -> Result<AppContext, CliError> {
    let ctx = AppContext::new(cfg, manifest, settings(args), &PluginServicesFactory).await?;
    Ok(ctx)
}
