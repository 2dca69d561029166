use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::code::ExitCode;

/// Load-time failures of the manifest model. None of these are retried; the
/// operator fixes the input and reloads.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    #[error("unknown dependency: track '{track}' depends on '{missing}'")]
    UnknownDependency { track: String, missing: String },

    #[error("malformed packet for track '{track}': {reason}")]
    MalformedPacket { track: String, reason: String },

    #[error("no track in the manifest uses packet {0}")]
    PacketNotInManifest(PathBuf),
}

impl ManifestError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Read { .. } => ExitCode::GeneralError,
            _ => ExitCode::ValidationError,
        }
    }

    pub fn remediation(&self) -> String {
        match self {
            Self::Read { path, .. } => format!("check that {} exists and is readable", path.display()),
            Self::MalformedManifest(_) | Self::UnknownDependency { .. } => {
                "fix manifest.json and rerun the same command".to_string()
            }
            Self::MalformedPacket { track, .. } => {
                format!("fix the packet file of track '{track}' and rerun")
            }
            Self::PacketNotInManifest(_) => {
                "pass --manifest-dir pointing at the manifest that lists this packet".to_string()
            }
        }
    }
}

/// A dependency cycle, reported as the ids along the cycle in dependency
/// order. The closing edge back to the first id is implied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    pub cycle: Vec<String>,
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cycle.join(" -> "))?;
        if let Some(first) = self.cycle.first() {
            write!(f, " -> {first}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CycleError {}

/// Dependency scheduler errors for track graph construction and ordering.
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("duplicate track id: {0}")]
    DuplicateTrackId(String),

    #[error("dependency not found: track '{track}' depends on '{missing}'")]
    DependencyNotFound { track: String, missing: String },

    #[error("circular dependency detected: {0}")]
    Cycle(#[from] CycleError),
}

impl ScheduleError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Cycle(_) => ExitCode::CycleDetected,
            _ => ExitCode::ValidationError,
        }
    }

    pub fn remediation(&self) -> String {
        match self {
            Self::Cycle(c) => format!(
                "break the cycle {c} by editing dependsOn in manifest.json, then rerun"
            ),
            _ => "fix manifest.json and rerun the same command".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_display_closes_the_loop() {
        let err = CycleError {
            cycle: vec!["A".into(), "B".into()],
        };
        assert_eq!(err.to_string(), "A -> B -> A");
    }

    #[test]
    fn cycle_maps_to_its_own_exit_code() {
        let err = ScheduleError::from(CycleError {
            cycle: vec!["A".into()],
        });
        assert_eq!(err.exit_code(), ExitCode::CycleDetected);
        assert!(err.remediation().contains("A -> A"));
    }
}
