//! Router-level tests for `POST /ask` and `GET /health`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use qr_agents::{Depth, ResearchSettings, Researcher};
use qr_core::testing::{MockProvider, MockTool};
use qr_core::{Error, ToolRegistry};
use qr_server::Server;

const RECORD_JSON: &str = r#"{"topic": "Photosynthesis", "summary": "Plants convert light, water and carbon dioxide into glucose and oxygen.", "sources": ["https://en.wikipedia.org/wiki/Photosynthesis"], "tools_used": ["wikipedia", "search"], "confidence_score": 0.9}"#;

fn app(provider: Arc<MockProvider>) -> Router {
    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(MockTool::new("search", "- Photosynthesis: how plants eat light")));
    tools.register(Arc::new(MockTool::new(
        "wikipedia",
        "Page: Photosynthesis\nSummary: Photosynthesis is a biological process.",
    )));
    let researcher = Researcher::new(provider, tools, ResearchSettings::default());
    Server::new(researcher, Depth::Detailed).router()
}

fn post_ask(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/ask")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_empty_body_is_bad_request() {
    let provider = Arc::new(MockProvider::new());
    let (status, body) = send(app(provider.clone()), post_ask("{}")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No query provided"}));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_blank_query_is_bad_request() {
    let provider = Arc::new(MockProvider::new());
    let (status, body) = send(app(provider), post_ask(r#"{"query": "   "}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No query provided");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let provider = Arc::new(MockProvider::new());
    let (status, body) = send(app(provider), post_ask("{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_ask_returns_record() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_tool_call("wikipedia", json!({"query": "photosynthesis"}));
    provider.queue_response(RECORD_JSON);

    let (status, body) = send(
        app(provider.clone()),
        post_ask(r#"{"query": "What is photosynthesis?"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let result = &body["result"];
    assert!(!result["topic"].as_str().unwrap().is_empty());
    assert!(!result["summary"].as_str().unwrap().is_empty());
    assert_eq!(result["confidence_score"], 0.9);
    assert!(body.get("error").is_none());
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_depth_selects_prompt() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_response(RECORD_JSON);

    let (status, _) = send(
        app(provider.clone()),
        post_ask(r#"{"query": "What is photosynthesis?", "depth": "quick"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let request = provider.last_request().unwrap();
    assert!(request.messages[0].content.contains("## Depth: quick"));
}

#[tokio::test]
async fn test_non_string_depth_falls_back_to_default() {
    for body in [
        r#"{"query": "What is photosynthesis?", "depth": 5}"#,
        r#"{"query": "What is photosynthesis?", "depth": ["quick"]}"#,
    ] {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response(RECORD_JSON);

        let (status, response) = send(app(provider.clone()), post_ask(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["result"]["topic"], "Photosynthesis");
        assert_eq!(provider.request_count(), 1);
        let request = provider.last_request().unwrap();
        assert!(request.messages[0].content.contains("## Depth: detailed"));
    }
}

#[tokio::test]
async fn test_irregular_output_still_succeeds() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_response("Sorry, I got distracted.");

    let (status, body) = send(
        app(provider),
        post_ask(r#"{"query": "What is photosynthesis?"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["topic"], "What is photosynthesis?");
    assert_eq!(body["result"]["sources"], json!(["System"]));
    assert_eq!(body["result"]["confidence_score"], 0.0);
}

#[tokio::test]
async fn test_upstream_failure_is_server_error() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_error(Error::network("connection refused"));

    let (status, body) = send(
        app(provider),
        post_ask(r#"{"query": "What is photosynthesis?"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
    assert_eq!(body["raw_response"], "Server error occurred");
}

#[tokio::test]
async fn test_decommissioned_model_message() {
    let provider = Arc::new(MockProvider::new());
    provider.queue_error(Error::model_decommissioned(
        "llama3-8b-8192",
        "The model `llama3-8b-8192` has been decommissioned",
    ));

    let (status, body) = send(
        app(provider),
        post_ask(r#"{"query": "What is photosynthesis?"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("llama3-8b-8192"));
    assert!(error.contains("llm.model"));
}

#[tokio::test]
async fn test_health() {
    let provider = Arc::new(MockProvider::new());
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(provider), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_cors_headers_present() {
    let provider = Arc::new(MockProvider::new());
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://example.com")
        .body(Body::empty())
        .unwrap();
    let response = app(provider).oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
