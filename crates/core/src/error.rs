//! Error types for the core library

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown request kind: {0}")]
    UnknownRequestKind(String),

    #[error("Missing required parameter: {0}")]
    MissingParam(&'static str),

    #[error("Invalid parameter {name}: {message}")]
    InvalidParam { name: &'static str, message: String },

    #[error("Invalid relation key: {0}")]
    InvalidRelationKey(String),

    #[error("Invalid artifact name: {0}")]
    InvalidArtifactName(String),

    #[error("Failed to write artifact {path}: {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Command error: {0}")]
    Command(#[from] command_runner::CommandError),

    #[error("{command} returned invalid JSON: {source}")]
    InvalidJson {
        command: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{command} returned unexpected output: {output}")]
    UnexpectedOutput { command: &'static str, output: String },

    #[error("Request task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_param(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParam {
            name,
            message: message.into(),
        }
    }

    /// True for errors caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownRequestKind(_)
                | Self::MissingParam(_)
                | Self::InvalidParam { .. }
                | Self::InvalidRelationKey(_)
                | Self::InvalidArtifactName(_)
        )
    }

    /// HTTP status code this error is reported with
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}
