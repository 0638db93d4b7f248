//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use plangate_core::query::QueryId;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    version: String,
    artifact_dir: String,
    datastore: String,
    next_query_id: QueryId,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let gateway = state.gateway();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        artifact_dir: gateway.artifacts().dir().to_string_lossy().to_string(),
        datastore: gateway.datastore().config().script.to_string_lossy().to_string(),
        next_query_id: gateway.query_ids().peek(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
