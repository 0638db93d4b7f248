//! The dispatch gateway
//!
//! Every request follows the same shape: validate, optionally write an
//! artifact, run the external command(s), translate the outcome.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use super::request::{DispatchRequest, RequestEnvelope, RequestKind};
use super::response::{ResponseEnvelope, SubmissionStatus};
use crate::artifact::ArtifactStore;
use crate::backend::{CompilerDriver, DatastoreClient, DatastoreCommand};
use crate::query::{QueryId, QueryIdAllocator, RelationKey};
use crate::{Error, Result};

/// Routes validated requests to the datastore and compiler
pub struct Gateway {
    datastore: DatastoreClient,
    compiler: CompilerDriver,
    artifacts: ArtifactStore,
    query_ids: QueryIdAllocator,
    public_url: String,
}

impl Gateway {
    pub fn new(
        datastore: DatastoreClient,
        compiler: CompilerDriver,
        artifacts: ArtifactStore,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            datastore,
            compiler,
            artifacts,
            query_ids: QueryIdAllocator::default(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Use an existing allocator instead of one starting at 0
    pub fn with_query_ids(mut self, query_ids: QueryIdAllocator) -> Self {
        self.query_ids = query_ids;
        self
    }

    pub fn query_ids(&self) -> &QueryIdAllocator {
        &self.query_ids
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn datastore(&self) -> &DatastoreClient {
        &self.datastore
    }

    /// Canonical URL of a submitted query
    pub fn query_url(&self, qid: QueryId) -> String {
        format!("{}/query?qid={}", self.public_url, qid)
    }

    /// Seed the query id allocator from the datastore.
    ///
    /// Returns the next id that will be handed out. If the datastore cannot
    /// be asked, numbering continues from the allocator's current position.
    pub async fn reseed(&self) -> QueryId {
        match self.datastore.latest_query_id().await {
            Ok(latest) => {
                let next = self.query_ids.seed(Some(latest));
                info!("Latest query id is {}, next is {}", latest, next);
                next
            }
            Err(e) => {
                warn!("Could not read latest query id, starting from current position: {}", e);
                self.query_ids.seed(None)
            }
        }
    }

    /// Validate and run a request whose kind is given by name
    pub async fn dispatch_named(&self, kind: &str, envelope: &RequestEnvelope) -> ResponseEnvelope {
        match kind.parse::<RequestKind>() {
            Ok(kind) => self.dispatch(kind, envelope).await,
            Err(e) => failure(kind, e),
        }
    }

    /// Validate and run a request, turning every failure into an error response
    pub async fn dispatch(&self, kind: RequestKind, envelope: &RequestEnvelope) -> ResponseEnvelope {
        let request = match DispatchRequest::from_envelope(kind, envelope) {
            Ok(request) => request,
            Err(e) => return failure(kind.as_str(), e),
        };

        match self.execute(request, envelope.received_at).await {
            Ok(response) => response,
            Err(e) => failure(kind.as_str(), e),
        }
    }

    /// Run an already validated request
    pub async fn execute(
        &self,
        request: DispatchRequest,
        received_at: DateTime<Utc>,
    ) -> Result<ResponseEnvelope> {
        match request {
            DispatchRequest::SubmitPlan {
                relation,
                backend,
                plan,
                raw_query,
            } => self.submit_plan(relation, backend, plan, raw_query).await,
            DispatchRequest::LegacySubmit { plan } => self.legacy_submit(plan, received_at).await,
            DispatchRequest::ListDatasets { backend } => {
                self.passthrough(DatastoreCommand::SelectAll { backend }).await
            }
            DispatchRequest::GetQueryStatus { qid } => {
                self.passthrough(DatastoreCommand::GetQueryStatus { qid }).await
            }
            DispatchRequest::GetQueryResult { qid } => {
                self.passthrough(DatastoreCommand::GetFilename { qid }).await
            }
            DispatchRequest::GetQueryRow { qid } => {
                self.reserialized(DatastoreCommand::SelectRow { qid }).await
            }
            DispatchRequest::CheckCatalogEntry { relation } => {
                self.reserialized(DatastoreCommand::CheckCatalog { relation }).await
            }
            DispatchRequest::CountTuples { relation } => {
                self.passthrough(DatastoreCommand::GetNumTuples { relation }).await
            }
            DispatchRequest::RegisterDataset { upload_info } => {
                self.passthrough(DatastoreCommand::InsertNewDataset { upload_info })
                    .await
            }
            DispatchRequest::RangeQueryList { backend, min, max } => {
                self.passthrough(DatastoreCommand::SelectTable { min, max, backend })
                    .await
            }
        }
    }

    /// Forward the command's stdout verbatim
    async fn passthrough(&self, command: DatastoreCommand) -> Result<ResponseEnvelope> {
        let output = self.datastore.call(&command).await?;
        Ok(ResponseEnvelope::ok_json(output.stdout).allow_any_origin())
    }

    /// Parse the command's stdout as JSON and serialize it again
    async fn reserialized(&self, command: DatastoreCommand) -> Result<ResponseEnvelope> {
        let output = self.datastore.call(&command).await?;
        let value: serde_json::Value =
            serde_json::from_str(&output.stdout).map_err(|source| Error::InvalidJson {
                command: command.name(),
                source,
            })?;
        Ok(ResponseEnvelope::ok_json(serde_json::to_string(&value)?).allow_any_origin())
    }

    /// Record, compile and run a plan, answering with the datastore's status for it
    async fn submit_plan(
        &self,
        relation: RelationKey,
        backend: String,
        plan: String,
        raw_query: Option<String>,
    ) -> Result<ResponseEnvelope> {
        let filename = relation.relation_name.clone();
        self.artifacts.path_for(&filename)?;

        let qid = self.query_ids.reserve();
        info!("Accepted query {} for {} on {}", qid, relation, backend);

        self.artifacts.write(&filename, &plan).await?;

        self.datastore
            .call(&DatastoreCommand::ProcessQuery {
                relation,
                url: self.query_url(qid),
                qid,
                backend: backend.clone(),
                raw_query: raw_query.unwrap_or_default(),
            })
            .await?;

        self.datastore
            .call(&DatastoreCommand::UpdateQueryRun {
                qid,
                filename,
                backend,
            })
            .await?;

        self.passthrough(DatastoreCommand::GetQueryStatus { qid }).await
    }

    /// Write `q<qid>.cpp`, run the compiler driver on it and report the timing
    async fn legacy_submit(
        &self,
        plan: String,
        received_at: DateTime<Utc>,
    ) -> Result<ResponseEnvelope> {
        let qid = self.query_ids.reserve();
        let basename = format!("q{}", qid);
        info!("Accepted single-shot query {}", qid);

        self.artifacts.write(&basename, &plan).await?;
        let output = self.compiler.compile(&basename).await?;

        let url = self.query_url(qid);
        let status = SubmissionStatus {
            url: url.clone(),
            start_time: received_at.timestamp_millis(),
            finish_time: Utc::now().timestamp_millis(),
            elapsed_nanos: u64::try_from(output.elapsed.as_nanos()).unwrap_or(u64::MAX),
            status: "SUCCESS".to_string(),
            query_id: qid,
        };

        Ok(ResponseEnvelope::ok_json(serde_json::to_string(&status)?).with_header("Location", url))
    }
}

fn failure(kind: &str, e: Error) -> ResponseEnvelope {
    if e.is_client_error() {
        warn!("Rejected {} request: {}", kind, e);
    } else {
        error!("{} failed: {}", kind, e);
    }
    ResponseEnvelope::from_error(&e)
}
