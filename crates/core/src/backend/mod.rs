//! External collaborators
//!
//! The datastore script and the compiler driver, reached only through the
//! command runner.

mod compiler;
mod datastore;

use std::time::Duration;

use command_runner::{CommandInvocation, DEFAULT_MAX_OUTPUT_BYTES};

pub use compiler::CompilerDriver;
pub use datastore::{DatastoreClient, DatastoreCommand, DatastoreConfig};

/// Resource limits applied to every external command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// None = wait for the command indefinitely
    pub timeout: Option<Duration>,
    pub max_output_bytes: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl ExecutionLimits {
    fn apply(&self, invocation: CommandInvocation) -> CommandInvocation {
        invocation
            .timeout(self.timeout)
            .max_output_bytes(self.max_output_bytes)
    }
}
