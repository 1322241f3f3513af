use std::path::PathBuf;

use thiserror::Error;

/// Runtime-recoverable errors: snapshot persistence and configuration.
///
/// Contract violations — an option-count change under a task id, an
/// out-of-range choice index, a setting registered with two controllers —
/// are programmer errors and assert instead of returning a variant here.
#[derive(Error, Debug)]
pub enum Error {
    /// Snapshot file could not be read or written.
    #[error("profile snapshot I/O ({path}): {source}")]
    SnapshotIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot contents are not valid JSON.
    #[error("profile snapshot parse: {0}")]
    SnapshotParse(#[from] serde_json::Error),

    /// Snapshot parsed but violates the profile data model.
    #[error("invalid profile snapshot: {0}")]
    InvalidSnapshot(String),

    /// Task id contains a character the persisted form forbids.
    #[error("invalid task id {id:?}: {reason}")]
    InvalidTaskId { id: String, reason: &'static str },

    /// Configuration field out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Wrap an I/O failure with the path it occurred on.
    pub fn snapshot_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::SnapshotIo {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid-snapshot error.
    pub fn invalid_snapshot(msg: impl Into<String>) -> Self {
        Error::InvalidSnapshot(msg.into())
    }

    /// Create an invalid-config error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
