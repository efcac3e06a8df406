use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use weaver_core::model::{GenerateRequest, ModelClient, ModelError, Turn};
use weaver_interaction::GeminiApiClient;

fn client_for(server: &MockServer) -> GeminiApiClient {
    GeminiApiClient::new("test-key", "gemini-test").with_base_url(server.url("/v1beta/models"))
}

#[tokio::test]
async fn posts_generate_content_with_key_header() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-test:generateContent")
                .header("x-goog-api-key", "test-key")
                .json_body(json!({
                    "contents": [{"role": "user", "parts": [{"text": "hello"}]}],
                    "systemInstruction": {"parts": [{"text": "be gentle"}]}
                }));
            then.status(200).json_body(json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "hi there"}]}}]
            }));
        })
        .await;

    let reply = client_for(&server)
        .generate(GenerateRequest {
            system_instruction: Some("be gentle".into()),
            contents: vec![Turn::user("hello")],
            response_schema: None,
        })
        .await
        .unwrap();

    assert_eq!(reply, "hi there");
    mock.assert_async().await;
}

#[tokio::test]
async fn sends_schema_as_generation_config() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-test:generateContent")
                .json_body_partial(
                    r#"{"generationConfig": {"responseMimeType": "application/json", "responseSchema": {"type": "OBJECT"}}}"#,
                );
            then.status(200).json_body(json!({
                "candidates": [{"content": {"parts": [{"text": "{}"}]}}]
            }));
        })
        .await;

    let reply = client_for(&server)
        .generate(GenerateRequest {
            system_instruction: None,
            contents: vec![Turn::user("analyze")],
            response_schema: Some(json!({"type": "OBJECT"})),
        })
        .await
        .unwrap();

    assert_eq!(reply, "{}");
    mock.assert_async().await;
}

#[tokio::test]
async fn maps_provider_errors() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(503)
                .header("retry-after", "4")
                .json_body(json!({"error": {"code": 503, "message": "overloaded", "status": "UNAVAILABLE"}}));
        })
        .await;

    let err = client_for(&server)
        .generate(GenerateRequest {
            contents: vec![Turn::user("hello")],
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ModelError::Http {
            status: 503,
            message: "UNAVAILABLE: overloaded".into(),
            is_retryable: true,
            retry_after: Some(Duration::from_secs(4)),
        }
    );
}

#[tokio::test]
async fn empty_candidates_return_empty_text() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({"candidates": []}));
        })
        .await;

    let reply = client_for(&server)
        .generate(GenerateRequest {
            contents: vec![Turn::user("hello")],
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(reply.is_empty());
}

#[tokio::test]
async fn http_timeout_maps_to_timeout_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(json!({"candidates": []}));
        })
        .await;

    let client = client_for(&server)
        .with_http_timeout(Duration::from_millis(50))
        .unwrap();
    let err = client
        .generate(GenerateRequest {
            contents: vec![Turn::user("hello")],
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err, ModelError::Timeout(Duration::from_millis(50)));
}

#[tokio::test]
async fn non_json_success_body_is_invalid_response() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).body("<html>gateway</html>");
        })
        .await;

    let err = client_for(&server)
        .generate(GenerateRequest {
            contents: vec![Turn::user("hello")],
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidResponse(_)));
}
