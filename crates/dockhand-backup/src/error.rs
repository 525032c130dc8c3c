//! Error taxonomy for the backup core
//!
//! Item-level errors ([`ArchiveError`], [`RotationError`], per-container
//! start failures) are converted into report counters by the orchestrator.
//! Only [`OperationError`] escapes an operation.

use dockhand_runtime::RuntimeError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Lock file could not be opened or locked (contention is not an error)
#[derive(Error, Debug)]
pub enum LockError {
    #[error("Failed to open lock file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Archiving or restoring a single volume failed
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Volume not found: {volume}")]
    VolumeNotFound { volume: String },

    #[error("Invalid volume name: {volume:?}")]
    InvalidVolumeName { volume: String },

    #[error("Failed to create helper container for volume {volume}: {source}")]
    HelperCreate {
        volume: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Failed to start helper container for volume {volume}: {source}")]
    HelperStart {
        volume: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Failed to copy volume {volume}: {source}")]
    Copy {
        volume: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Archive not found: {path}")]
    ArchiveNotFound { path: PathBuf },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ArchiveError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Listing archives for rotation failed
#[derive(Error, Debug)]
pub enum RotationError {
    #[error("Failed to list archives in {dir}: {source}")]
    List {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reading, decoding or writing the state snapshot failed
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Snapshot {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Snapshot {path} has unsupported version {version}")]
    UnsupportedVersion { path: PathBuf, version: u32 },
}

/// Whole-operation failure, distinguished by category
#[derive(Error, Debug)]
pub enum OperationError {
    /// Another invocation holds the lock
    #[error("{operation} is already running (lock {lock} is held)")]
    AlreadyRunning { operation: String, lock: PathBuf },

    /// The lock file itself is unusable
    #[error(transparent)]
    Lock(#[from] LockError),

    /// The target set could not be determined
    #[error("Cannot determine targets for {operation}: {message}")]
    Enumeration { operation: String, message: String },

    /// The snapshot could not be read or written
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl OperationError {
    pub fn enumeration(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::Enumeration {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Contention is an expected outcome, not a fault
    pub fn is_contention(&self) -> bool {
        matches!(self, Self::AlreadyRunning { .. })
    }

    /// Process exit status for this category
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AlreadyRunning { .. } => 0,
            Self::Enumeration { .. } => 2,
            Self::Snapshot(_) => 3,
            Self::Lock(_) => 4,
        }
    }
}
