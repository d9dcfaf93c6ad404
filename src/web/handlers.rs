//! HTTP request handlers.
//!
//! Handlers are thin: they validate the request shape, then run the
//! CPU-bound engine on a blocking thread under the request timeout.
//! Ill-formed requests get HTTP 400; everything the engine itself
//! detects (including semantic errors) rides in a 200 body.

use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use crate::engine::{CheckOptions, CheckResult, Deadline};
use crate::parsing::is_valid_symbol;
use crate::web::responses::{check_result_to_json, json_error};
use crate::web::AppState;

/// Accepts either a native boolean or the strings "true"/"false".
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LooseBool {
    Bool(bool),
    Text(String),
}

impl LooseBool {
    fn as_bool(&self) -> bool {
        match self {
            LooseBool::Bool(value) => *value,
            LooseBool::Text(text) => text.to_lowercase() == "true",
        }
    }
}

/// Accepts a comma-separated string or a list of names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SymbolList {
    Csv(String),
    List(Vec<String>),
}

impl SymbolList {
    fn into_names(self) -> Vec<String> {
        match self {
            SymbolList::Csv(text) => text
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| is_valid_symbol(s))
                .collect(),
            SymbolList::List(names) => names
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| is_valid_symbol(s))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub test: Option<String>,
    pub target: Option<String>,
    pub symbols: Option<SymbolList>,
    pub check_symbols: Option<LooseBool>,
    pub description: Option<String>,
    pub hints: Option<Vec<String>>,
    pub simplify_derivatives: Option<LooseBool>,
}

impl CheckRequest {
    fn options(&self) -> CheckOptions {
        CheckOptions {
            symbols: self
                .symbols
                .clone()
                .map(SymbolList::into_names)
                .unwrap_or_default(),
            check_symbols: self
                .check_symbols
                .as_ref()
                .map(LooseBool::as_bool)
                .unwrap_or(true),
            description: self.description.clone(),
            hints: self.hints.clone().unwrap_or_default(),
            simplify_derivatives: self
                .simplify_derivatives
                .as_ref()
                .map(LooseBool::as_bool)
                .unwrap_or(false),
        }
    }
}

/// Validate the request envelope; both strings must be present and
/// non-empty or the request is ill-formed.
fn validate(body: &CheckRequest) -> Result<(String, String), Response> {
    let (Some(test), Some(target)) = (&body.test, &body.target) else {
        warn!("Ill-formed request: missing 'test' or 'target'");
        return Err(json_error(StatusCode::BAD_REQUEST, "Ill-formed request!"));
    };
    if test.is_empty() || target.is_empty() {
        warn!("Empty string in request");
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            "Empty string in request!",
        ));
    }
    Ok((test.clone(), target.clone()))
}

async fn run_checked<F>(
    state: &AppState,
    target: String,
    test: String,
    task: F,
) -> Response
where
    F: FnOnce(Deadline) -> CheckResult + Send + 'static,
{
    let timeout = Duration::from_secs(state.timeout_seconds);
    let deadline = Deadline::after(timeout);
    let work = tokio::task::spawn_blocking(move || task(deadline));
    match tokio::time::timeout(timeout, work).await {
        Ok(Ok(result)) => Json(check_result_to_json(&result)).into_response(),
        Ok(Err(join_error)) => {
            error!("Checker task failed: {join_error}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal checker error")
        }
        Err(_elapsed) => {
            warn!("Request took too long to process, aborting");
            let body = json!({
                "target": target,
                "test": test,
                "error": "Request took too long to process!",
            });
            Json(body).into_response()
        }
    }
}

/// Check the equivalence of two mathematical expressions.
pub async fn check_maths(
    State(state): State<AppState>,
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!("Ill-formed request body: {rejection}");
            return json_error(StatusCode::BAD_REQUEST, "Ill-formed request!");
        }
    };
    let (test, target) = match validate(&body) {
        Ok(strings) => strings,
        Err(response) => return response,
    };
    let options = body.options();
    let checker = state.maths.clone();
    let (target_echo, test_echo) = (target.clone(), test.clone());
    run_checked(&state, target_echo, test_echo, move |deadline| {
        checker.check(&test, &target, &options, &deadline)
    })
    .await
}

/// Check the equivalence of two boolean logic expressions.
pub async fn check_logic(
    State(state): State<AppState>,
    body: Result<Json<CheckRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!("Ill-formed request body: {rejection}");
            return json_error(StatusCode::BAD_REQUEST, "Ill-formed request!");
        }
    };
    let (test, target) = match validate(&body) {
        Ok(strings) => strings,
        Err(response) => return response,
    };
    let options = body.options();
    let checker = state.logic.clone();
    let (target_echo, test_echo) = (target.clone(), test.clone());
    run_checked(&state, target_echo, test_echo, move |deadline| {
        checker.check(&test, &target, &options, &deadline)
    })
    .await
}

/// Liveness probe for production monitoring.
pub async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "code": 200 }))
}

/// JSON 404 for anything outside the route table.
pub async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "Not Found")
}
