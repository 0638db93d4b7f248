//! Description of a single external command run

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default cap on captured bytes per output stream
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 200 * 1024;

/// Everything needed to start one external process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Program to execute (looked up on PATH when not a path)
    pub program: String,
    /// Ordered arguments, passed verbatim
    pub args: Vec<String>,
    /// Working directory (inherits the server's when unset)
    pub working_dir: Option<PathBuf>,
    /// Additional environment variables
    pub env: Vec<(String, String)>,
    /// Kill the process after this long (None = wait forever)
    pub timeout: Option<Duration>,
    /// Maximum bytes captured from each of stdout and stderr
    pub max_output_bytes: usize,
}

impl CommandInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            timeout: None,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_output_bytes(mut self, limit: usize) -> Self {
        self.max_output_bytes = limit;
        self
    }
}

impl fmt::Display for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {:?}", arg)?;
        }
        Ok(())
    }
}
