//! Request-level tests: built model handles hit the right endpoint with the
//! configured credential and headers.

use std::collections::HashMap;

use matrix_config::{Config, Credential, ProviderConfig, ProviderType, SelectedModel, Tier};
use matrix_llm::Builder;
use serde_json::json;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer, provider: ProviderConfig, model: SelectedModel) -> Config {
    let mut config = Config::new();
    let id = model.provider.clone();
    config.providers.insert(
        id.clone(),
        ProviderConfig {
            id,
            base_url: server.uri(),
            ..provider
        },
    );
    config.models.insert(Tier::Large, model);
    config
}

#[tokio::test]
async fn test_anthropic_request_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(header(
            "anthropic-beta",
            "tools-2024,interleaved-thinking-2025-05-14",
        ))
        .and(header("x-trace", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let mut selected = SelectedModel::new("claude-big", "anthropic");
    selected.think = true;
    let config = config_for(
        &server,
        ProviderConfig {
            provider_type: Some(ProviderType::Anthropic),
            credential: Some(Credential::ApiKey("sk-ant-test".into())),
            extra_headers: HashMap::from([
                ("anthropic-beta".to_string(), "tools-2024".to_string()),
                ("x-trace".to_string(), "abc".to_string()),
            ]),
            ..Default::default()
        },
        selected,
    );

    let (large, _) = Builder::new(&config).build_models().unwrap();
    let response = large
        .model
        .post()
        .json(&json!({"model": large.model.model_id(), "max_tokens": 1}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_anthropic_bearer_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("authorization", "Bearer oauth-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(
        &server,
        ProviderConfig {
            provider_type: Some(ProviderType::Anthropic),
            credential: Some(Credential::Bearer("oauth-token".into())),
            ..Default::default()
        },
        SelectedModel::new("claude-big", "anthropic"),
    );

    let (large, _) = Builder::new(&config).build_models().unwrap();
    let response = large.model.post().send().await.unwrap();
    assert!(response.status().is_success());

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("x-api-key").is_none());
}

#[tokio::test]
async fn test_openai_compatible_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer gsk-test"))
        .and(header_exists("x-title"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(
        &server,
        ProviderConfig {
            provider_type: Some(ProviderType::OpenAiCompat),
            credential: Some(Credential::ApiKey("gsk-test".into())),
            extra_headers: HashMap::from([("X-Title".to_string(), "Matrix".to_string())]),
            ..Default::default()
        },
        SelectedModel::new("llama", "groq"),
    );

    let (large, small) = Builder::new(&config).build_models().unwrap();
    assert_eq!(small.model.endpoint(), large.model.endpoint());
    let response = large.model.post().json(&json!({})).send().await.unwrap();
    assert!(response.status().is_success());
}
