//! Query status, result and listing routes

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};

use plangate_core::dispatch::RequestKind;

use super::{dispatch_body, dispatch_query, GatewayResponse};
use crate::state::AppState;

/// Full datastore row of one query
async fn get_query(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> GatewayResponse {
    dispatch_query(&state, RequestKind::GetQueryRow, "/query", params).await
}

async fn get_status(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> GatewayResponse {
    dispatch_query(&state, RequestKind::GetQueryStatus, "/status", params).await
}

/// Result tuples of a finished query
async fn get_data(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> GatewayResponse {
    dispatch_query(&state, RequestKind::GetQueryResult, "/data", params).await
}

async fn list_queries(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> GatewayResponse {
    dispatch_query(&state, RequestKind::RangeQueryList, "/queries", params).await
}

async fn search_queries(
    State(state): State<AppState>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> GatewayResponse {
    dispatch_body(&state, RequestKind::RangeQueryList, "/queries", body).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/query", get(get_query))
        .route("/status", get(get_status))
        .route("/data", get(get_data))
        .route("/queries", get(list_queries).post(search_queries))
}
