use thiserror::Error;

use super::code::ExitCode;
use super::manifest::ScheduleError;
use super::store::StoreError;

/// Failures that stop a run-all before or between rounds. Track failures are
/// not errors here; they are collected in the run summary.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RunError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Schedule(e) => e.exit_code(),
            Self::Store(_) => ExitCode::GeneralError,
        }
    }

    pub fn remediation(&self) -> String {
        match self {
            Self::Schedule(e) => e.remediation(),
            Self::Store(_) => {
                "fix the problem and rerun `packetflow run-all <manifest-dir>`; completed tracks are skipped"
                    .to_string()
            }
        }
    }
}
