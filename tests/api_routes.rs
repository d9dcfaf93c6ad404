//! HTTP surface tests: route shapes, status codes, and the JSON error
//! contract, driven through the router without binding a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use equality_checker::engine::{LogicChecker, MathsChecker};
use equality_checker::web::{AppState, WebServer};

fn router() -> Router {
    WebServer::create_router(AppState {
        maths: Arc::new(MathsChecker::new()),
        logic: Arc::new(LogicChecker::new()),
        timeout_seconds: 5,
    })
}

async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    (status, value)
}

#[tokio::test]
async fn liveness_probe_responds() {
    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let response = router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["code"], 200);
}

#[tokio::test]
async fn maths_check_happy_path() {
    let (status, body) = post_json(
        router(),
        "/check",
        json!({"test": "1 + x", "target": "x + 1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["equal"], "true");
    assert_eq!(body["equality_type"], "exact");
    assert_eq!(body["target"], "x + 1");
    assert_eq!(body["test"], "1 + x");
    assert!(body.get("parsed_target").is_some());
}

#[tokio::test]
async fn maths_alias_route_matches() {
    let (status, body) = post_json(
        router(),
        "/check/maths",
        json!({"test": "(x+1)*(x+1)", "target": "x^2+2*x+1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["equal"], "true");
    assert_eq!(body["equality_type"], "symbolic");
}

#[tokio::test]
async fn logic_route_checks_formulae() {
    let (status, body) = post_json(
        router(),
        "/check/logic",
        json!({"test": "~A | ~B", "target": "~(A & B)"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["equal"], "true");
    assert_eq!(body["equality_type"], "symbolic");
}

#[tokio::test]
async fn missing_fields_are_bad_requests() {
    let (status, body) = post_json(router(), "/check", json!({"test": "x"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(body.get("equal").is_none());
}

#[tokio::test]
async fn empty_strings_are_bad_requests() {
    let (status, body) =
        post_json(router(), "/check", json!({"test": "", "target": "x"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn undecodable_bodies_are_bad_requests() {
    let request = Request::builder()
        .method("POST")
        .uri("/check")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("this is not json"))
        .unwrap();
    let response = router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["code"], 400);
}

#[tokio::test]
async fn engine_detected_errors_ride_in_a_200_body() {
    // Target-side parse failure: fatal for the question, still HTTP 200.
    let (status, body) = post_json(
        router(),
        "/check",
        json!({"test": "x", "target": "sin(x"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 400);
    assert!(body.get("error").is_some());

    // Test-side syntax failure.
    let (status, body) = post_json(
        router(),
        "/check",
        json!({"test": "sin(x", "target": "x"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["syntax_error"], "true");
}

#[tokio::test]
async fn check_symbols_accepts_string_and_bool() {
    let (_, strict) = post_json(
        router(),
        "/check",
        json!({"test": "(y/y)*x", "target": "x", "check_symbols": "true"}),
    )
    .await;
    assert_eq!(strict["equal"], "false");
    assert!(strict.get("incorrect_symbols").is_some());

    let (_, relaxed) = post_json(
        router(),
        "/check",
        json!({"test": "(y/y)*x", "target": "x", "check_symbols": false}),
    )
    .await;
    assert_eq!(relaxed["equal"], "true");
}

#[tokio::test]
async fn symbols_list_prevents_splitting() {
    let (_, body) = post_json(
        router(),
        "/check",
        json!({
            "test": "velocity",
            "target": "velocity",
            "symbols": "velocity"
        }),
    )
    .await;
    assert_eq!(body["equal"], "true");
    assert_eq!(body["equality_type"], "exact");
}

#[tokio::test]
async fn hints_are_honoured() {
    let (_, body) = post_json(
        router(),
        "/check",
        json!({
            "test": "ln(x)",
            "target": "log(x)",
            "hints": ["natural_logarithm"]
        }),
    )
    .await;
    assert_eq!(body["equal"], "true");
}

#[tokio::test]
async fn unknown_routes_return_json_404() {
    let request = Request::builder()
        .method("GET")
        .uri("/definitely/not/a/route")
        .body(Body::empty())
        .unwrap();
    let response = router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("application/json"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["code"], 404);
}

#[tokio::test]
async fn plus_minus_round_trips_over_http() {
    let (_, body) = post_json(
        router(),
        "/check",
        json!({"test": "a ± b", "target": "a ± b"}),
    )
    .await;
    assert_eq!(body["equal"], "true");
    assert_eq!(body["equality_type"], "exact");
}

#[tokio::test]
async fn responses_are_json_content_type() {
    let request = Request::builder()
        .method("POST")
        .uri("/check")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"test": "x", "target": "x"}).to_string(),
        ))
        .unwrap();
    let response = router().oneshot(request).await.unwrap();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("application/json"));
}
