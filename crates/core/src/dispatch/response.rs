//! Response envelopes

use serde::Serialize;
use serde_json::json;

use crate::query::QueryId;
use crate::Error;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Transport-neutral description of an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ResponseEnvelope {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: JSON_CONTENT_TYPE.to_string(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::json(200, body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn allow_any_origin(self) -> Self {
        self.with_header("Access-Control-Allow-Origin", "*")
    }

    /// Error response: `{"status":"FAILURE","error":"..."}`
    pub fn from_error(error: &Error) -> Self {
        let body = json!({
            "status": "FAILURE",
            "error": error.to_string(),
        });
        Self::json(error.status_code(), body.to_string())
    }

    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Status reported for a single-shot plan submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStatus {
    pub url: String,
    /// Milliseconds since the Unix epoch
    pub start_time: i64,
    pub finish_time: i64,
    pub elapsed_nanos: u64,
    pub status: String,
    pub query_id: QueryId,
}
