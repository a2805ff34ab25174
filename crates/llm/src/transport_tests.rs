// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> HttpTransportConfig {
    HttpTransportConfig {
        endpoint: format!("{}/v1/chat/completions", server.uri()),
        api_key: "test-key".into(),
        model: "test-model".into(),
        max_tokens: 4_096,
    }
}

fn request() -> LlmRequest {
    LlmRequest { system: "sys".into(), user: "user".into() }
}

#[tokio::test]
async fn success_returns_the_first_choice_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"pois\": []}"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(config(&server));
    let body = transport.complete(&request()).await.unwrap();
    assert_eq!(body, "{\"pois\": []}");
}

#[tokio::test]
async fn non_success_status_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(config(&server));
    let err = transport.complete(&request()).await.unwrap_err();
    match err {
        LlmError::Transport(message) => {
            assert!(message.contains("429"));
            assert!(message.contains("rate limited"));
        }
        other => panic!("expected transport error, got {other}"),
    }
}

#[tokio::test]
async fn empty_choices_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(config(&server));
    assert!(transport.complete(&request()).await.is_err());
}

#[tokio::test]
async fn malformed_envelope_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(config(&server));
    let err = transport.complete(&request()).await.unwrap_err();
    assert!(err.to_string().contains("envelope"));
}
