//! Datastore script client
//!
//! Every bookkeeping operation is a subcommand of the datastore script,
//! invoked as `<script> <subcommand> -p <params...>`.

use std::path::PathBuf;
use std::sync::Arc;

use command_runner::{CommandInvocation, CommandOutput, CommandRunner};
use tracing::{debug, error, info};

use super::ExecutionLimits;
use crate::query::{QueryId, RelationKey};
use crate::{Error, Result};

/// One datastore subcommand with its positional parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatastoreCommand {
    /// Record a newly accepted query
    ProcessQuery {
        relation: RelationKey,
        url: String,
        qid: QueryId,
        backend: String,
        raw_query: String,
    },
    /// Mark a query running and execute its compiled plan
    UpdateQueryRun {
        qid: QueryId,
        filename: String,
        backend: String,
    },
    GetQueryStatus { qid: QueryId },
    CheckCatalog { relation: RelationKey },
    /// Queries for a backend with ids in `min..=max` (`max == 0` = unbounded)
    SelectTable { min: u64, max: u64, backend: String },
    SelectRow { qid: QueryId },
    SelectAll { backend: String },
    /// Result tuples of a finished query
    GetFilename { qid: QueryId },
    GetNumTuples { relation: RelationKey },
    GetLatestQid,
    /// Import datasets described by an uploaded CSV file
    InsertNewDataset { upload_info: String },
}

impl DatastoreCommand {
    /// Subcommand name understood by the script
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProcessQuery { .. } => "process_query",
            Self::UpdateQueryRun { .. } => "update_query_run",
            Self::GetQueryStatus { .. } => "get_query_status",
            Self::CheckCatalog { .. } => "check_catalog",
            Self::SelectTable { .. } => "select_table",
            Self::SelectRow { .. } => "select_row",
            Self::SelectAll { .. } => "select_all",
            Self::GetFilename { .. } => "get_filename",
            Self::GetNumTuples { .. } => "get_num_tuples",
            Self::GetLatestQid => "get_latest_qid",
            Self::InsertNewDataset { .. } => "insert_new_dataset",
        }
    }

    /// Positional parameters, in the order the script expects them
    pub fn params(&self) -> Vec<String> {
        match self {
            Self::ProcessQuery {
                relation,
                url,
                qid,
                backend,
                raw_query,
            } => vec![
                relation.to_string(),
                url.clone(),
                qid.to_string(),
                backend.clone(),
                encode_raw_query(raw_query),
            ],
            Self::UpdateQueryRun {
                qid,
                filename,
                backend,
            } => vec![qid.to_string(), filename.clone(), backend.clone()],
            Self::GetQueryStatus { qid } | Self::SelectRow { qid } | Self::GetFilename { qid } => {
                vec![qid.to_string()]
            }
            Self::CheckCatalog { relation } | Self::GetNumTuples { relation } => relation.params(),
            Self::SelectTable { min, max, backend } => {
                vec![min.to_string(), max.to_string(), backend.clone()]
            }
            Self::SelectAll { backend } => vec![backend.clone()],
            Self::GetLatestQid => Vec::new(),
            Self::InsertNewDataset { upload_info } => vec![upload_info.clone()],
        }
    }
}

/// Where and how to run the datastore script
#[derive(Debug, Clone)]
pub struct DatastoreConfig {
    pub script: PathBuf,
    /// Run the script through this interpreter instead of executing it directly
    pub interpreter: Option<String>,
    pub working_dir: Option<PathBuf>,
    pub limits: ExecutionLimits,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            script: PathBuf::from("./datastore.py"),
            interpreter: None,
            working_dir: None,
            limits: ExecutionLimits::default(),
        }
    }
}

/// Runs datastore subcommands
#[derive(Clone)]
pub struct DatastoreClient {
    runner: Arc<dyn CommandRunner>,
    config: DatastoreConfig,
}

impl DatastoreClient {
    pub fn new(runner: Arc<dyn CommandRunner>, config: DatastoreConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &DatastoreConfig {
        &self.config
    }

    /// Build the process invocation for `command`
    pub fn invocation(&self, command: &DatastoreCommand) -> CommandInvocation {
        let script = self.config.script.to_string_lossy().into_owned();
        let mut invocation = match &self.config.interpreter {
            Some(interpreter) => CommandInvocation::new(interpreter.clone()).arg(script),
            None => CommandInvocation::new(script),
        };

        invocation = invocation.arg(command.name());
        let params = command.params();
        if !params.is_empty() {
            invocation = invocation.arg("-p").args(params);
        }

        if let Some(dir) = &self.config.working_dir {
            invocation = invocation.current_dir(dir);
        }

        self.config.limits.apply(invocation)
    }

    /// Run `command`, failing on spawn errors and non-zero exits
    pub async fn call(&self, command: &DatastoreCommand) -> Result<CommandOutput> {
        let invocation = self.invocation(command);
        debug!("datastore {}: {}", command.name(), invocation);

        match self.runner.run_checked(&invocation).await {
            Ok(output) => {
                info!(
                    "datastore {} finished in {:?} (exit {:?})",
                    command.name(),
                    output.elapsed,
                    output.exit_code
                );
                Ok(output)
            }
            Err(e) => {
                error!("datastore {} failed: {}", command.name(), e);
                Err(e.into())
            }
        }
    }

    /// Highest query id recorded by the datastore
    pub async fn latest_query_id(&self) -> Result<QueryId> {
        let command = DatastoreCommand::GetLatestQid;
        let output = self.call(&command).await?;
        output
            .stdout
            .trim()
            .parse()
            .map_err(|_| Error::UnexpectedOutput {
                command: command.name(),
                output: output.stdout.trim().to_string(),
            })
    }
}

/// Percent-encode the raw query; the script decodes it again.
///
/// `-` is left alone by the encoder, so a leading one is escaped by hand.
fn encode_raw_query(raw_query: &str) -> String {
    let encoded = urlencoding::encode(raw_query);
    match encoded.strip_prefix('-') {
        Some(rest) => format!("%2D{}", rest),
        None => encoded.into_owned(),
    }
}
