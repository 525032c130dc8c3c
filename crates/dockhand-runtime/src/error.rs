//! Runtime error types

use thiserror::Error;

/// Result type alias for runtime calls
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Failures talking to the container runtime
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The runtime CLI is not on PATH
    #[error("{binary} not found in PATH")]
    NotInstalled { binary: String },

    /// The runtime CLI could not be spawned
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The runtime CLI exited unsuccessfully
    #[error("'{command}' failed (exit status {status:?}): {stderr}")]
    CommandFailed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// Runtime output could not be understood
    #[error("Unexpected runtime output: {message}")]
    Parse { message: String },

    /// Streaming to or from the runtime failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    pub fn command_failed(command: impl Into<String>, status: Option<i32>, stderr: &[u8]) -> Self {
        Self::CommandFailed {
            command: command.into(),
            status,
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}
