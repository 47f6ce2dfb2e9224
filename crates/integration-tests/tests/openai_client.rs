//! Integration tests for the chat-completions HTTP client.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use helper_server::config::OpenAiConfig;
use helper_server::llm::{ChatMessage, ChatModel, ModelError, OpenAiClient, helper_tools};

const API_KEY: &str = "sk-test-Q3v9Lm2Xp7RtW8zK";

fn client(server: &MockServer, timeout: Duration) -> OpenAiClient {
    OpenAiClient::new(&OpenAiConfig {
        api_key: SecretString::from(API_KEY),
        model: "gpt-3.5-turbo".to_string(),
        base_url: format!("{}/v1", server.uri()),
        timeout,
    })
    .unwrap()
}

fn transcript() -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You are a matchmaking assistant."),
        ChatMessage::user("I'm a caregiver in New York"),
    ]
}

#[tokio::test]
async fn test_sends_auth_model_and_functions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", format!("Bearer {API_KEY}").as_str()))
        .and(body_partial_json(json!({
            "model": "gpt-3.5-turbo",
            "messages": [
                {"role": "system", "content": "You are a matchmaking assistant."},
                {"role": "user", "content": "I'm a caregiver in New York"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "What is your hourly rate?"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 20, "completion_tokens": 6, "total_tokens": 26}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server, Duration::from_secs(5))
        .complete(transcript(), helper_tools())
        .await
        .unwrap();

    let message = response.first_message().unwrap();
    assert_eq!(message.text(), Some("What is your hourly rate?"));
    assert!(message.invocation().is_none());

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["functions"].as_array().unwrap().len(), helper_tools().len());
}

#[tokio::test]
async fn test_decodes_function_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "function_call": {
                        "name": "store_provider",
                        "arguments": "{\"location\": \"New York, NY\"}"
                    }
                },
                "finish_reason": "function_call"
            }]
        })))
        .mount(&server)
        .await;

    let response = client(&server, Duration::from_secs(5))
        .complete(transcript(), helper_tools())
        .await
        .unwrap();

    let call = response.first_message().unwrap().invocation().unwrap();
    assert_eq!(call.name, "store_provider");
    assert_eq!(call.arguments, json!("{\"location\": \"New York, NY\"}"));
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "17"))
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .complete(transcript(), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::RateLimited(17)));
}

#[tokio::test]
async fn test_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .complete(transcript(), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::Unauthorized(_)));
}

#[tokio::test]
async fn test_api_error_envelope_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "This model's maximum context length is 4097 tokens.",
                "type": "invalid_request_error"
            }
        })))
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .complete(transcript(), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ModelError::Api { status: 400, ref message } if message.contains("maximum context length")
    ));
}

#[tokio::test]
async fn test_undecodable_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_secs(5))
        .complete(transcript(), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::Parse(_)));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": []}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = client(&server, Duration::from_millis(200))
        .complete(transcript(), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::Timeout(_)));
}
