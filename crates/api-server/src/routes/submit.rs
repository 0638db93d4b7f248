//! Plan submission route
//!
//! `POST /` accepts two body shapes: a relation-keyed submission
//! (`relkey`, `backend`, `plan`, `rawQuery`) that is recorded in the
//! datastore, and a bare `{ "plan": ... }` single-shot compile.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde_json::{Map, Value};

use plangate_core::dispatch::RequestKind;

use super::{dispatch_body, GatewayResponse};
use crate::state::AppState;

async fn submit_plan(
    State(state): State<AppState>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> GatewayResponse {
    let kind = match &body {
        Ok(Json(fields)) if !fields.contains_key("relkey") => RequestKind::LegacySubmit,
        _ => RequestKind::SubmitPlan,
    };
    dispatch_body(&state, kind, "/", body).await
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(submit_plan))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::StatusCode;
    use plangate_core::testing::ScriptedRunner;
    use serde_json::{json, Value};

    use crate::routes::test_support::{body_text, post_json};
    use crate::state::test_support::build_state;

    const STATUS_JSON: &str = "{\"status\": \"ACCEPTED\", \"queryId\": 0}\n";

    #[tokio::test]
    async fn relation_submission_writes_source_and_reports_status() {
        let runner = Arc::new(ScriptedRunner::new().respond("get_query_status", STATUS_JSON));
        let (state, tmp) = build_state(Arc::clone(&runner));

        let response = post_json(
            super::router().with_state(state.clone()),
            "/",
            json!({
                "relkey": "alice_prog_rel",
                "backend": "b1",
                "plan": "int main(){}",
                "rawQuery": "select 1"
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, STATUS_JSON);

        let source = tmp.path().join("c_test_environment").join("rel.cpp");
        assert_eq!(std::fs::read_to_string(source).unwrap(), "int main(){}");

        let update = &runner.calls_to("update_query_run")[0];
        assert_eq!(update.args, vec!["update_query_run", "-p", "0", "rel", "b1"]);
        assert_eq!(state.gateway().query_ids().peek(), 1);
    }

    #[tokio::test]
    async fn client_hang_up_does_not_cut_submission_short() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("get_query_status", STATUS_JSON)
                .delay(Duration::from_millis(50)),
        );
        let (state, tmp) = build_state(Arc::clone(&runner));

        let request = post_json(
            super::router().with_state(state),
            "/",
            json!({"relkey": "alice_prog_rel", "backend": "b1", "plan": "int main(){}"}),
        );
        let abandoned = tokio::time::timeout(Duration::from_millis(20), request).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(500)).await;

        let subcommands: Vec<String> = runner
            .calls()
            .into_iter()
            .map(|call| call.args[0].clone())
            .collect();
        assert_eq!(
            subcommands,
            vec!["process_query", "update_query_run", "get_query_status"]
        );
        assert!(tmp.path().join("c_test_environment").join("rel.cpp").exists());
    }

    #[tokio::test]
    async fn relation_key_with_extra_fields_is_rejected() {
        let runner = Arc::new(ScriptedRunner::new());
        let (state, tmp) = build_state(Arc::clone(&runner));

        let response = post_json(
            super::router().with_state(state.clone()),
            "/",
            json!({"relkey": "alice_prog_edge_list", "backend": "clang", "plan": "int main(){}"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(runner.calls().is_empty());
        assert!(!tmp.path().join("c_test_environment").join("edge_list.cpp").exists());
        assert_eq!(state.gateway().query_ids().peek(), 0);
    }

    #[tokio::test]
    async fn bare_plan_is_compiled_in_one_shot() {
        let runner = Arc::new(ScriptedRunner::new());
        let (state, tmp) = build_state(Arc::clone(&runner));

        let response = post_json(
            super::router().with_state(state),
            "/",
            json!({"plan": "int main(){return 1;}"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["location"],
            "http://localhost:1337/query?qid=0"
        );
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["queryId"], 0);
        assert_eq!(body["status"], "SUCCESS");

        let source = tmp.path().join("c_test_environment").join("q0.cpp");
        assert_eq!(std::fs::read_to_string(source).unwrap(), "int main(){return 1;}");

        let compile = &runner.calls()[0];
        assert_eq!(compile.program, "python");
        assert_eq!(compile.args, vec!["runclang.py", "clang", "q0"]);
    }

    #[tokio::test]
    async fn submission_without_plan_is_rejected() {
        let runner = Arc::new(ScriptedRunner::new());
        let (state, _tmp) = build_state(Arc::clone(&runner));
        let app = super::router().with_state(state.clone());

        let response = post_json(app.clone(), "/", json!({})).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = post_json(app, "/", json!({"relkey": "alice_prog_rel", "backend": "b1"})).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert!(runner.calls().is_empty());
        assert_eq!(state.gateway().query_ids().peek(), 0);
    }

    #[tokio::test]
    async fn failed_run_is_server_error() {
        let runner = Arc::new(ScriptedRunner::new().refuse("./datastore.py"));
        let (state, _tmp) = build_state(Arc::clone(&runner));

        let response = post_json(
            super::router().with_state(state),
            "/",
            json!({"relkey": "alice_prog_rel", "backend": "b1", "plan": "x"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["status"], "FAILURE");
    }
}
