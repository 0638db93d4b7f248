//! Dataset and catalog routes

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};

use plangate_core::dispatch::{RequestKind, ResponseEnvelope};

use super::{dispatch_body, dispatch_query, GatewayResponse};
use crate::state::AppState;

/// Datasets produced on a backend
async fn list_datasets(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> GatewayResponse {
    dispatch_query(&state, RequestKind::ListDatasets, "/dataset", params).await
}

/// Latest catalog entry for a relation key
async fn check_catalog(
    State(state): State<AppState>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> GatewayResponse {
    dispatch_body(&state, RequestKind::CheckCatalogEntry, "/catalog", body).await
}

/// Tuple count of the latest query producing a relation
async fn count_tuples(
    State(state): State<AppState>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> GatewayResponse {
    dispatch_body(&state, RequestKind::CountTuples, "/tuples", body).await
}

/// Register datasets described by an uploaded file
async fn register_dataset(
    State(state): State<AppState>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> GatewayResponse {
    dispatch_body(&state, RequestKind::RegisterDataset, "/new", body).await
}

async fn upload_location(State(state): State<AppState>) -> GatewayResponse {
    let body = json!({ "dir": state.upload_dir().to_string_lossy() });
    GatewayResponse(ResponseEnvelope::ok_json(body.to_string()).allow_any_origin())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dataset", get(list_datasets))
        .route("/catalog", post(check_catalog))
        .route("/tuples", post(count_tuples))
        .route("/new", post(register_dataset))
        .route("/uploadLocation", get(upload_location))
}
