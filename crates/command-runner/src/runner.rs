//! Process execution

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, trace, warn};

use crate::error::{CommandError, Result};
use crate::invocation::CommandInvocation;

/// Output from a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// None when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub success: bool,
    pub elapsed: Duration,
}

impl CommandOutput {
    /// Turn a failed exit into an error
    pub fn ensure_success(self, program: &str) -> Result<Self> {
        if self.success {
            return Ok(self);
        }

        Err(CommandError::NonZeroExit {
            program: program.to_string(),
            code: self.exit_code,
            stderr: self.stderr.trim().to_string(),
        })
    }
}

/// Something that can run a [`CommandInvocation`] to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command and capture its output, whatever the exit status
    async fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput>;

    /// Run the command and return an error if it does not exit successfully
    async fn run_checked(&self, invocation: &CommandInvocation) -> Result<CommandOutput> {
        let output = self.run(invocation).await?;
        output.ensure_success(&invocation.program)
    }
}

/// Runs commands as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput> {
        debug!("Running {} in {:?}", invocation, invocation.working_dir);

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }

        let started = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| CommandError::spawn_failed_with_source(&invocation.program, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CommandError::spawn_failed(&invocation.program, "Failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CommandError::spawn_failed(&invocation.program, "Failed to capture stderr"))?;

        let limit = invocation.max_output_bytes;

        // Dropping this future leaves the child running; only the timeout kills it.
        let completion = async {
            tokio::try_join!(
                child.wait(),
                read_capped(stdout, limit),
                read_capped(stderr, limit)
            )
        };

        let finished = match invocation.timeout {
            Some(timeout) => tokio::time::timeout(timeout, completion).await.ok(),
            None => Some(completion.await),
        };

        let (status, stdout, stderr) = match finished {
            Some(result) => result?,
            None => {
                let timeout = invocation.timeout.unwrap_or_default();
                warn!("{} timed out after {:?}, killing it", invocation.program, timeout);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", invocation.program, e);
                }
                return Err(CommandError::TimedOut {
                    program: invocation.program.clone(),
                    timeout,
                });
            }
        };
        let elapsed = started.elapsed();

        if stdout.overflowed || stderr.overflowed {
            return Err(CommandError::OutputLimitExceeded {
                program: invocation.program.clone(),
                limit,
            });
        }

        let stdout = String::from_utf8_lossy(&stdout.bytes).to_string();
        let stderr = String::from_utf8_lossy(&stderr.bytes).to_string();

        trace!("{} stdout: {}", invocation.program, stdout);
        if !stderr.is_empty() {
            trace!("{} stderr: {}", invocation.program, stderr);
        }

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code: status.code(),
            success: status.success(),
            elapsed,
        })
    }
}

struct Captured {
    bytes: Vec<u8>,
    overflowed: bool,
}

/// Read a stream to EOF, keeping at most `limit` bytes.
///
/// The stream is drained past the limit so the child never blocks on a full pipe.
async fn read_capped<R>(mut reader: R, limit: usize) -> std::io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    let mut overflowed = false;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(bytes.len());
        if n > room {
            overflowed = true;
        }
        bytes.extend_from_slice(&chunk[..n.min(room)]);
    }

    Ok(Captured { bytes, overflowed })
}
