use thiserror::Error;

use super::code::ExitCode;
use super::manifest::{ManifestError, ScheduleError};
use super::merge::MergeError;
use super::run::RunError;
use super::store::StoreError;
use super::track::TrackError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Track(#[from] TrackError),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl CliError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::ConfigError,
            Self::Command(_) => ExitCode::GeneralError,
            Self::Manifest(e) => e.exit_code(),
            Self::Schedule(e) => e.exit_code(),
            Self::Track(e) => e.exit_code(),
            Self::Merge(e) => e.exit_code(),
            Self::Run(e) => e.exit_code(),
            Self::Store(_) | Self::Io(_) | Self::Anyhow(_) => ExitCode::GeneralError,
        }
    }

    pub fn remediation(&self) -> Option<String> {
        match self {
            Self::Manifest(e) => Some(e.remediation()),
            Self::Schedule(e) => Some(e.remediation()),
            Self::Track(e) => Some(e.remediation()),
            Self::Merge(e) => Some(e.remediation()),
            Self::Run(e) => Some(e.remediation()),
            _ => None,
        }
    }
}
