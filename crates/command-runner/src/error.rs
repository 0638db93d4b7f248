//! Error types for command execution

use std::time::Duration;
use thiserror::Error;

/// Result type alias for command operations
pub type Result<T> = std::result::Result<T, CommandError>;

/// Errors that can occur while running an external command
#[derive(Debug, Error)]
pub enum CommandError {
    /// The process could not be started
    #[error("Failed to spawn {program}: {message}")]
    SpawnFailed {
        program: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// The process ran but reported failure
    #[error("{program} exited with code {code:?}: {stderr}")]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The process did not finish in time and was killed
    #[error("{program} timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    /// The process wrote more than the configured capture limit
    #[error("{program} exceeded the output limit of {limit} bytes")]
    OutputLimitExceeded { program: String, limit: usize },

    /// IO error while talking to the process
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommandError {
    /// Create a SpawnFailed error
    pub fn spawn_failed(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SpawnFailed {
            program: program.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a SpawnFailed error with source
    pub fn spawn_failed_with_source(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            program: program.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }
}
