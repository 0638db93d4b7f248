//! Compiler driver
//!
//! Compiles and runs a plan source that was written to the artifact directory.

use std::path::PathBuf;
use std::sync::Arc;

use command_runner::{CommandInvocation, CommandOutput, CommandRunner};
use tracing::{error, info};

use super::ExecutionLimits;
use crate::Result;

/// Runs `<program> <args...> <artifact basename>` in the artifact directory
#[derive(Clone)]
pub struct CompilerDriver {
    runner: Arc<dyn CommandRunner>,
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    limits: ExecutionLimits,
}

impl CompilerDriver {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        program: impl Into<String>,
        args: Vec<String>,
        working_dir: impl Into<PathBuf>,
        limits: ExecutionLimits,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            args,
            working_dir: working_dir.into(),
            limits,
        }
    }

    pub fn invocation(&self, basename: &str) -> CommandInvocation {
        let invocation = CommandInvocation::new(self.program.clone())
            .args(self.args.iter().cloned())
            .arg(basename)
            .current_dir(&self.working_dir);
        self.limits.apply(invocation)
    }

    /// Compile and run the artifact `basename`, failing on a non-zero exit
    pub async fn compile(&self, basename: &str) -> Result<CommandOutput> {
        let invocation = self.invocation(basename);

        match self.runner.run_checked(&invocation).await {
            Ok(output) => {
                info!("{} done in {:?}", basename, output.elapsed);
                Ok(output)
            }
            Err(e) => {
                error!("compiling {} failed: {}", basename, e);
                Err(e.into())
            }
        }
    }
}
