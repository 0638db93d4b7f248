//! Test doubles for the external commands

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use command_runner::{CommandError, CommandInvocation, CommandOutput, CommandRunner};

enum Scripted {
    Output(CommandOutput),
    SpawnFailure,
}

/// Records every invocation and answers with scripted output.
///
/// A script matches an invocation whose program or any argument equals its
/// key (e.g. a datastore subcommand name). Unmatched invocations succeed
/// with empty output.
#[derive(Default)]
pub struct ScriptedRunner {
    scripts: Mutex<Vec<(String, Scripted)>>,
    calls: Mutex<Vec<CommandInvocation>>,
    delay: Duration,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed with `stdout`
    pub fn respond(self, key: &str, stdout: &str) -> Self {
        self.script(key, Scripted::Output(output(stdout, "", Some(0))))
    }

    /// Exit with `code` and `stderr`
    pub fn fail(self, key: &str, code: i32, stderr: &str) -> Self {
        self.script(key, Scripted::Output(output("", stderr, Some(code))))
    }

    /// Fail to start at all
    pub fn refuse(self, key: &str) -> Self {
        self.script(key, Scripted::SpawnFailure)
    }

    /// Take `delay` to answer every invocation
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn script(self, key: &str, scripted: Scripted) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .push((key.to_string(), scripted));
        self
    }

    /// Every invocation so far, in order
    pub fn calls(&self) -> Vec<CommandInvocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Invocations matching `key`
    pub fn calls_to(&self, key: &str) -> Vec<CommandInvocation> {
        self.calls()
            .into_iter()
            .filter(|invocation| matches_key(invocation, key))
            .collect()
    }
}

fn matches_key(invocation: &CommandInvocation, key: &str) -> bool {
    invocation.program == key || invocation.args.iter().any(|arg| arg == key)
}

fn output(stdout: &str, stderr: &str, code: Option<i32>) -> CommandOutput {
    CommandOutput {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        exit_code: code,
        success: code == Some(0),
        elapsed: Duration::from_millis(5),
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &CommandInvocation) -> command_runner::Result<CommandOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripts = self.scripts.lock().unwrap();
        match scripts.iter().find(|(key, _)| matches_key(invocation, key)) {
            Some((_, Scripted::Output(output))) => Ok(output.clone()),
            Some((_, Scripted::SpawnFailure)) => Err(CommandError::spawn_failed(
                invocation.program.clone(),
                "scripted spawn failure",
            )),
            None => Ok(output("", "", Some(0))),
        }
    }
}
