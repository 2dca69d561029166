use std::path::{Path, PathBuf};

use anyhow::Context;

use super::types::AppConfig;

pub const LOCAL_CONFIG_FILE: &str = "packetflow.toml";

/// Default packetflow data directory: ~/.packetflow
pub fn get_packetflow_data_dir() -> anyhow::Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".packetflow"))
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))
}

/// Resolve the config: `~/.packetflow/config.toml` first, then
/// `./packetflow.toml`, then defaults. Environment overrides apply last.
pub fn load_default() -> anyhow::Result<AppConfig> {
    let data_dir = get_packetflow_data_dir()?;
    let home_config = data_dir.join("config.toml");
    let local_config = Path::new(LOCAL_CONFIG_FILE);

    let mut cfg = if home_config.exists() {
        load_file(&home_config)?
    } else if local_config.exists() {
        load_file(local_config)?
    } else {
        AppConfig::default()
    };

    if cfg.logging.file && blank(cfg.logging.directory.as_deref()) {
        let logs_dir = data_dir.join("logs");
        std::fs::create_dir_all(&logs_dir)
            .with_context(|| format!("failed to create {}", logs_dir.display()))?;
        cfg.logging.directory = Some(logs_dir.to_string_lossy().to_string());
    }

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

/// Load an explicit config file; environment overrides still apply.
pub fn load_from(path: &Path) -> anyhow::Result<AppConfig> {
    let mut cfg = load_file(path)?;
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

fn load_file(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str::<AppConfig>(&s).with_context(|| format!("invalid config {}", path.display()))
}

/// `PACKETFLOW_STATE_DIR`, `PACKETFLOW_LOG_LEVEL`, `PACKETFLOW_MAX_PARALLEL`.
pub fn apply_env_overrides(
    cfg: &mut AppConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("PACKETFLOW_STATE_DIR").filter(|v| !v.trim().is_empty()) {
        cfg.state.dir = Some(v);
    }
    if let Some(v) = lookup("PACKETFLOW_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
        cfg.logging.level = v;
    }
    if let Some(v) = lookup("PACKETFLOW_MAX_PARALLEL").filter(|v| !v.trim().is_empty()) {
        cfg.scheduler.max_parallel = v
            .trim()
            .parse()
            .with_context(|| format!("PACKETFLOW_MAX_PARALLEL is not a number: '{v}'"))?;
    }
    Ok(())
}

fn blank(s: Option<&str>) -> bool {
    s.map(|s| s.trim().is_empty()).unwrap_or(true)
}
