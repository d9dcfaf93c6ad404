//! Response shaping for the HTTP surface.
//!
//! Every payload that leaves the service is JSON, including errors the
//! framework would otherwise render as HTML. Check results serialise the
//! way the assessment platform expects: `equal` and `syntax_error` are
//! the strings "true"/"false", `code` is numeric, and absent fields are
//! omitted entirely.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Map, Value};

use crate::engine::CheckResult;

/// Render a check outcome as the wire-format JSON object.
pub fn check_result_to_json(result: &CheckResult) -> Value {
    let mut body = Map::new();
    if let Some(target) = &result.target {
        body.insert("target".into(), json!(target));
    }
    if let Some(test) = &result.test {
        body.insert("test".into(), json!(test));
    }
    if let Some(parsed_target) = &result.parsed_target {
        body.insert("parsed_target".into(), json!(parsed_target));
    }
    if let Some(parsed_test) = &result.parsed_test {
        body.insert("parsed_test".into(), json!(parsed_test));
    }
    if let Some(equal) = result.equal {
        body.insert("equal".into(), json!(equal.to_string()));
    }
    if let Some(equality_type) = result.equality_type {
        body.insert("equality_type".into(), json!(equality_type.as_str()));
    }
    if let Some(mismatch) = &result.incorrect_symbols {
        let mut breakdown = Map::new();
        if let Some(missing) = &mismatch.missing {
            breakdown.insert("missing".into(), json!(missing));
        }
        if let Some(extra) = &mismatch.extra {
            breakdown.insert("extra".into(), json!(extra));
        }
        body.insert("incorrect_symbols".into(), Value::Object(breakdown));
    }
    if let Some(error) = &result.error {
        body.insert("error".into(), json!(error));
    }
    if result.syntax_error {
        body.insert("syntax_error".into(), json!("true"));
    }
    if let Some(code) = result.code {
        body.insert("code".into(), json!(code));
    }
    if let Some(case) = result.case {
        body.insert("case".into(), json!(case.to_string()));
    }
    Value::Object(body)
}

/// A JSON error page in place of the framework's HTML ones.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    let body = json!({
        "message": message,
        "code": status.as_u16(),
        "error": status.canonical_reason().unwrap_or("Error"),
    });
    (status, Json(body)).into_response()
}
