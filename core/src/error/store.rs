use std::path::PathBuf;

use thiserror::Error;

/// Failures of the durable stores (checkpoints, completion markers, merge state).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corrupt record at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unsupported format version {found} at {path}")]
    UnsupportedVersion { path: PathBuf, found: u32 },

    #[error("track id '{0}' cannot be used as a storage key")]
    InvalidKey(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
