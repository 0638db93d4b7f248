//! Route handlers

pub mod datasets;
pub mod health;
pub mod queries;
pub mod submit;

use std::collections::HashMap;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use plangate_core::dispatch::{RequestEnvelope, RequestKind, ResponseEnvelope};
use plangate_core::Error;

use crate::state::AppState;

/// HTTP form of a gateway response
pub struct GatewayResponse(pub ResponseEnvelope);

impl IntoResponse for GatewayResponse {
    fn into_response(self) -> Response {
        let envelope = self.0;
        let status =
            StatusCode::from_u16(envelope.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = (status, envelope.body).into_response();
        let headers = response.headers_mut();
        if let Ok(content_type) = HeaderValue::from_str(&envelope.content_type) {
            headers.insert(header::CONTENT_TYPE, content_type);
        }
        for (name, value) in envelope.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => warn!("Dropping unrepresentable header {}: {:?}", name, value),
            }
        }
        response
    }
}

/// Create the router for every gateway endpoint
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(datasets::router())
        .merge(queries::router())
        .merge(submit::router())
}

/// Dispatch a request whose parameters come from the query string
async fn dispatch_query(
    state: &AppState,
    kind: RequestKind,
    path: &str,
    params: HashMap<String, String>,
) -> GatewayResponse {
    debug!("GET {} params: {:?}", path, params);
    let envelope = RequestEnvelope::new("GET", path).with_query(params);
    dispatch_detached(state, kind, envelope).await
}

/// Dispatch a request whose parameters come from a JSON object body
async fn dispatch_body(
    state: &AppState,
    kind: RequestKind,
    path: &str,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> GatewayResponse {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return bad_body(path, rejection),
    };

    debug!("POST {} body: {:?}", path, body);
    let envelope = RequestEnvelope::new("POST", path).with_body(body);
    dispatch_detached(state, kind, envelope).await
}

/// Run the dispatch on its own task.
///
/// A client hanging up drops the handler future; the spawned task keeps
/// going so a submission's command sequence is never cut short.
async fn dispatch_detached(
    state: &AppState,
    kind: RequestKind,
    envelope: RequestEnvelope,
) -> GatewayResponse {
    let state = state.clone();
    let task = tokio::spawn(async move { state.gateway().dispatch(kind, &envelope).await });

    match task.await {
        Ok(response) => GatewayResponse(response),
        Err(e) => {
            error!("{} task failed: {}", kind, e);
            let error = Error::TaskFailed(e.to_string());
            GatewayResponse(ResponseEnvelope::from_error(&error))
        }
    }
}

fn bad_body(path: &str, rejection: JsonRejection) -> GatewayResponse {
    warn!("Rejected body for {}: {}", path, rejection.body_text());
    let error = Error::invalid_param("body", rejection.body_text());
    GatewayResponse(ResponseEnvelope::from_error(&error))
}
