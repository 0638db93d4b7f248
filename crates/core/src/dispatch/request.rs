//! Request kinds and their parameters

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::query::{QueryId, RelationKey};
use crate::{Error, Result};

/// The fixed set of operations the gateway performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    SubmitPlan,
    LegacySubmit,
    ListDatasets,
    GetQueryStatus,
    GetQueryResult,
    GetQueryRow,
    CheckCatalogEntry,
    CountTuples,
    RegisterDataset,
    RangeQueryList,
}

impl RequestKind {
    pub const ALL: [RequestKind; 10] = [
        Self::SubmitPlan,
        Self::LegacySubmit,
        Self::ListDatasets,
        Self::GetQueryStatus,
        Self::GetQueryResult,
        Self::GetQueryRow,
        Self::CheckCatalogEntry,
        Self::CountTuples,
        Self::RegisterDataset,
        Self::RangeQueryList,
    ];

    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitPlan => "submit-plan",
            Self::LegacySubmit => "legacy-submit",
            Self::ListDatasets => "list-datasets",
            Self::GetQueryStatus => "get-query-status",
            Self::GetQueryResult => "get-query-result",
            Self::GetQueryRow => "get-query-row",
            Self::CheckCatalogEntry => "check-catalog-entry",
            Self::CountTuples => "count-tuples",
            Self::RegisterDataset => "register-dataset",
            Self::RangeQueryList => "range-query-list",
        }
    }
}

impl FromStr for RequestKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownRequestKind(s.to_string()))
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request as it arrived, before validation
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: Option<Map<String, Value>>,
    pub received_at: DateTime<Utc>,
}

impl RequestEnvelope {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: HashMap::new(),
            body: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    /// Look a parameter up in the body first, then the query string.
    ///
    /// Scalar JSON values are rendered as text; `null` counts as absent.
    pub fn param(&self, name: &str) -> Option<String> {
        let from_body = self
            .body
            .as_ref()
            .and_then(|body| body.get(name))
            .and_then(|value| match value {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            });

        from_body.or_else(|| self.query.get(name).cloned())
    }

    fn required(&self, name: &'static str) -> Result<String> {
        self.param(name)
            .filter(|value| !value.trim().is_empty())
            .ok_or(Error::MissingParam(name))
    }

    /// A required value passed positionally to the datastore.
    ///
    /// A leading `-` would be read as an option by the script.
    fn argument(&self, name: &'static str) -> Result<String> {
        let value = self.required(name)?;
        if value.starts_with('-') {
            return Err(Error::invalid_param(name, "must not start with '-'"));
        }
        Ok(value)
    }

    fn optional(&self, name: &str) -> Option<String> {
        self.param(name).filter(|value| !value.trim().is_empty())
    }

    fn query_id(&self) -> Result<QueryId> {
        let raw = self.required("qid")?;
        parse_unsigned("qid", &raw)
    }

    fn bound(&self, name: &'static str) -> Result<u64> {
        match self.optional(name) {
            Some(raw) => parse_unsigned(name, &raw),
            None => Ok(0),
        }
    }

    fn relation_parts(&self) -> Result<RelationKey> {
        RelationKey::new(
            self.required("userName")?,
            self.required("programName")?,
            self.required("relationName")?,
        )
    }
}

fn parse_unsigned(name: &'static str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| Error::invalid_param(name, format!("expected an unsigned integer, got {:?}", raw)))
}

/// A validated request with typed parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchRequest {
    SubmitPlan {
        relation: RelationKey,
        backend: String,
        plan: String,
        raw_query: Option<String>,
    },
    LegacySubmit {
        plan: String,
    },
    ListDatasets {
        backend: String,
    },
    GetQueryStatus {
        qid: QueryId,
    },
    GetQueryResult {
        qid: QueryId,
    },
    GetQueryRow {
        qid: QueryId,
    },
    CheckCatalogEntry {
        relation: RelationKey,
    },
    CountTuples {
        relation: RelationKey,
    },
    RegisterDataset {
        upload_info: String,
    },
    /// `min`/`max` of 0 mean unbounded
    RangeQueryList {
        backend: String,
        min: u64,
        max: u64,
    },
}

impl DispatchRequest {
    /// Validate the parameters `kind` needs
    pub fn from_envelope(kind: RequestKind, envelope: &RequestEnvelope) -> Result<Self> {
        let request = match kind {
            RequestKind::SubmitPlan => Self::SubmitPlan {
                relation: RelationKey::parse(&envelope.required("relkey")?)?,
                backend: envelope.argument("backend")?,
                plan: envelope.required("plan")?,
                raw_query: envelope.optional("rawQuery"),
            },
            RequestKind::LegacySubmit => Self::LegacySubmit {
                plan: envelope.required("plan")?,
            },
            RequestKind::ListDatasets => Self::ListDatasets {
                backend: envelope.argument("backend")?,
            },
            RequestKind::GetQueryStatus => Self::GetQueryStatus {
                qid: envelope.query_id()?,
            },
            RequestKind::GetQueryResult => Self::GetQueryResult {
                qid: envelope.query_id()?,
            },
            RequestKind::GetQueryRow => Self::GetQueryRow {
                qid: envelope.query_id()?,
            },
            RequestKind::CheckCatalogEntry => Self::CheckCatalogEntry {
                relation: envelope.relation_parts()?,
            },
            RequestKind::CountTuples => Self::CountTuples {
                relation: envelope.relation_parts()?,
            },
            RequestKind::RegisterDataset => Self::RegisterDataset {
                upload_info: envelope.argument("uploadinfo")?,
            },
            RequestKind::RangeQueryList => Self::RangeQueryList {
                backend: envelope.argument("backend")?,
                min: envelope.bound("min")?,
                max: envelope.bound("max")?,
            },
        };

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> RequestEnvelope {
        let Value::Object(map) = value else {
            panic!("test body must be an object");
        };
        RequestEnvelope::new("POST", "/").with_body(map)
    }

    fn query(pairs: &[(&str, &str)]) -> RequestEnvelope {
        let query = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RequestEnvelope::new("GET", "/").with_query(query)
    }

    #[test]
    fn test_request_kind_names_round_trip() {
        for kind in RequestKind::ALL {
            assert_eq!(kind.as_str().parse::<RequestKind>().unwrap(), kind);
        }
        assert!(matches!(
            "drop-everything".parse::<RequestKind>(),
            Err(Error::UnknownRequestKind(_))
        ));
    }

    #[test]
    fn test_unknown_kind_is_a_client_error() {
        let err = "explode".parse::<RequestKind>().unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_submit_plan_params() {
        let envelope = body(json!({
            "relkey": "alice_prog_rel",
            "backend": "b1",
            "plan": "int main(){}",
            "rawQuery": "select 1"
        }));

        let request = DispatchRequest::from_envelope(RequestKind::SubmitPlan, &envelope).unwrap();
        assert_eq!(
            request,
            DispatchRequest::SubmitPlan {
                relation: RelationKey::parse("alice_prog_rel").unwrap(),
                backend: "b1".to_string(),
                plan: "int main(){}".to_string(),
                raw_query: Some("select 1".to_string()),
            }
        );
    }

    #[test]
    fn test_submit_plan_requires_plan_and_valid_relkey() {
        let missing_plan = body(json!({"relkey": "a_b_c", "backend": "b1", "plan": ""}));
        assert!(matches!(
            DispatchRequest::from_envelope(RequestKind::SubmitPlan, &missing_plan),
            Err(Error::MissingParam("plan"))
        ));

        let bad_key = body(json!({"relkey": "nounderscores", "backend": "b1", "plan": "x"}));
        assert!(matches!(
            DispatchRequest::from_envelope(RequestKind::SubmitPlan, &bad_key),
            Err(Error::InvalidRelationKey(_))
        ));
    }

    #[test]
    fn test_query_id_must_be_numeric() {
        let request =
            DispatchRequest::from_envelope(RequestKind::GetQueryStatus, &query(&[("qid", "12")]))
                .unwrap();
        assert_eq!(request, DispatchRequest::GetQueryStatus { qid: 12 });

        let err = DispatchRequest::from_envelope(RequestKind::GetQueryStatus, &query(&[("qid", "12; rm")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParam { name: "qid", .. }));

        let err = DispatchRequest::from_envelope(RequestKind::GetQueryResult, &query(&[])).unwrap_err();
        assert!(matches!(err, Error::MissingParam("qid")));
    }

    #[test]
    fn test_range_bounds_default_to_zero() {
        let request =
            DispatchRequest::from_envelope(RequestKind::RangeQueryList, &query(&[("backend", "b1")]))
                .unwrap();
        assert_eq!(
            request,
            DispatchRequest::RangeQueryList {
                backend: "b1".to_string(),
                min: 0,
                max: 0
            }
        );
    }

    #[test]
    fn test_numeric_body_values_are_accepted() {
        let envelope = body(json!({"backend": "grappa", "min": 3, "max": null}));
        let request = DispatchRequest::from_envelope(RequestKind::RangeQueryList, &envelope).unwrap();
        assert_eq!(
            request,
            DispatchRequest::RangeQueryList {
                backend: "grappa".to_string(),
                min: 3,
                max: 0
            }
        );
    }

    #[test]
    fn test_datastore_arguments_cannot_look_like_options() {
        let err = DispatchRequest::from_envelope(RequestKind::ListDatasets, &query(&[("backend", "-h")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParam { name: "backend", .. }));
        assert_eq!(err.status_code(), 400);

        let upload = body(json!({"uploadinfo": "--help"}));
        assert!(matches!(
            DispatchRequest::from_envelope(RequestKind::RegisterDataset, &upload),
            Err(Error::InvalidParam { name: "uploadinfo", .. })
        ));

        let submission = body(json!({"relkey": "alice_prog_rel", "backend": "--x", "plan": "-1"}));
        assert!(matches!(
            DispatchRequest::from_envelope(RequestKind::SubmitPlan, &submission),
            Err(Error::InvalidParam { name: "backend", .. })
        ));

        let catalog = body(json!({"userName": "-u", "programName": "p", "relationName": "r"}));
        assert!(matches!(
            DispatchRequest::from_envelope(RequestKind::CheckCatalogEntry, &catalog),
            Err(Error::InvalidRelationKey(_))
        ));
    }

    #[test]
    fn test_body_takes_precedence_over_query() {
        let envelope = body(json!({"backend": "from-body"}))
            .with_query([("backend".to_string(), "from-query".to_string())].into());
        assert_eq!(envelope.param("backend").as_deref(), Some("from-body"));
        assert_eq!(envelope.param("missing"), None);
    }

    #[test]
    fn test_catalog_relation_from_body() {
        let envelope = body(json!({
            "userName": "public",
            "programName": "adhoc",
            "relationName": "twitter"
        }));
        let request =
            DispatchRequest::from_envelope(RequestKind::CheckCatalogEntry, &envelope).unwrap();
        assert_eq!(
            request,
            DispatchRequest::CheckCatalogEntry {
                relation: RelationKey::new("public", "adhoc", "twitter").unwrap()
            }
        );

        let incomplete = body(json!({"userName": "public", "programName": "adhoc"}));
        assert!(matches!(
            DispatchRequest::from_envelope(RequestKind::CountTuples, &incomplete),
            Err(Error::MissingParam("relationName"))
        ));
    }
}
