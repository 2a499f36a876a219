//! HTTP behaviour of the completion client against a local mock server

use sahayak::integration::{
    ConversationOrchestrator, TurnOutcome, CREDENTIAL_FAILURE_MESSAGE, GENERIC_FAILURE_MESSAGE,
};
use sahayak::llm::{ApiConfig, CompletionClient, GeminiClient};
use sahayak::messages::Sender;
use sahayak::{Mode, SahayakError};
use serde_json::json;
use std::sync::Arc;
use wiremock::{
    matchers::{body_partial_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const GENERATE_PATH: &str = "/v1beta/models/test-model:generateContent";

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn client_for(server: &MockServer, key: Option<&str>) -> GeminiClient {
    let mut config = ApiConfig::new(format!("{}{}", server.uri(), GENERATE_PATH));
    if let Some(key) = key {
        config = config.with_api_key(key);
    }
    GeminiClient::new(config).unwrap()
}

fn reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn test_request_shape_and_reply() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "parts": [{ "text": "What is diabetes?" }] }],
            "generationConfig": {
                "temperature": 0.7,
                "topK": 40,
                "topP": 0.95,
                "maxOutputTokens": 1024
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("Diabetes is...")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, Some("test-key"));
    let text = client.complete("What is diabetes?").await.unwrap();
    assert_eq!(text, "Diabetes is...");
}

#[tokio::test]
async fn test_error_status_carries_message() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server, Some("bad-key"))
        .complete("hello")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        SahayakError::ApiError {
            status: 400,
            message: Some("API key not valid. Please pass a valid API key.".to_string()),
        }
    );
    assert!(err.is_credential_error());
}

#[tokio::test]
async fn test_error_status_without_body() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = client_for(&server, Some("k")).complete("hello").await.unwrap_err();
    assert_eq!(
        err,
        SahayakError::ApiError {
            status: 503,
            message: None,
        }
    );
    assert_eq!(err.to_string(), "API error: 503 - Unknown error");
}

#[tokio::test]
async fn test_missing_text_is_format_error() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let err = client_for(&server, Some("k")).complete("hello").await.unwrap_err();
    assert!(matches!(err, SahayakError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_missing_key_sends_nothing() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let err = client_for(&server, None).complete("hello").await.unwrap_err();
    assert_eq!(err, SahayakError::MissingApiKey);
}

#[tokio::test]
async fn test_rate_limited_turn() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "Resource has been exhausted" }
        })))
        .mount(&server)
        .await;

    let orchestrator =
        ConversationOrchestrator::builder(Arc::new(client_for(&server, Some("k")))).build();
    orchestrator.select_mode(Mode::Information);

    let outcome = orchestrator.submit("What is diabetes?").await;

    assert!(matches!(
        outcome,
        TurnOutcome::Failed(SahayakError::ApiError { status: 429, .. })
    ));
    let history = orchestrator.history(Mode::Information);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].sender, Sender::User);
    assert_eq!(history[1].sender, Sender::System);
    assert_eq!(history[1].text, GENERIC_FAILURE_MESSAGE);
    assert!(!orchestrator.is_processing());
}

#[tokio::test]
async fn test_rejected_key_turn_adds_credential_notice() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "Permission denied" }
        })))
        .mount(&server)
        .await;

    let orchestrator =
        ConversationOrchestrator::builder(Arc::new(client_for(&server, Some("k")))).build();
    orchestrator.submit("hello").await;

    let texts: Vec<_> = orchestrator
        .history(Mode::Information)
        .into_iter()
        .map(|m| m.text)
        .collect();
    assert_eq!(
        texts,
        vec![
            "hello".to_string(),
            GENERIC_FAILURE_MESSAGE.to_string(),
            CREDENTIAL_FAILURE_MESSAGE.to_string(),
        ]
    );
}
