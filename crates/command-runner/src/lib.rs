//! External command execution library
//!
//! This crate runs external programs with an explicit argument vector,
//! capturing their exit status, standard output and standard error.
//! Arguments are never passed through a shell.

mod error;
mod invocation;
mod runner;

pub use error::{CommandError, Result};
pub use invocation::{CommandInvocation, DEFAULT_MAX_OUTPUT_BYTES};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
