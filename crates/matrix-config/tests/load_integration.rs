//! End-to-end loading tests.
//!
//! These run the full pipeline: file discovery, merge, metadata sync against a
//! mock catwalk server, provider resolution and tier selection.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use matrix_config::{
    Credential, EnvResolver, Loader, ModelDescriptor, ProviderDescriptor, ProviderSync,
    ProviderType, Tier, read_config_file, save_config,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn catalog() -> Vec<ProviderDescriptor> {
    let model = |id: &str, name: &str| ModelDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        context_window: 200_000,
        ..Default::default()
    };
    vec![
        ProviderDescriptor {
            id: "anthropic".into(),
            name: "Anthropic".into(),
            provider_type: Some(ProviderType::Anthropic),
            api_key: "$ANTHROPIC_API_KEY".into(),
            api_endpoint: "https://api.anthropic.com".into(),
            default_large_model_id: "claude-big".into(),
            default_small_model_id: "claude-small".into(),
            models: vec![model("claude-big", "Claude Big"), model("claude-small", "Claude Small")],
            ..Default::default()
        },
        ProviderDescriptor {
            id: "openai".into(),
            name: "OpenAI".into(),
            provider_type: Some(ProviderType::OpenAi),
            api_key: "$OPENAI_API_KEY".into(),
            api_endpoint: "https://api.openai.com/v1".into(),
            default_large_model_id: "gpt-big".into(),
            default_small_model_id: "gpt-small".into(),
            models: vec![model("gpt-big", "GPT Big"), model("gpt-small", "GPT Small")],
            ..Default::default()
        },
    ]
}

async fn catwalk() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/providers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog()))
        .mount(&server)
        .await;
    server
}

fn env(vars: &[(&str, &str)]) -> EnvResolver {
    EnvResolver::with_env(
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
    )
}

fn write(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

#[tokio::test]
async fn test_full_load_with_remote_metadata() -> Result<()> {
    let server = catwalk().await;
    let dir = TempDir::new()?;
    let data_dir = dir.path().join("data");

    write(
        &dir.path().join("global/matrix.json"),
        r#"{
            "providers": {
                "openai": {"api_key": "$OPENAI_API_KEY"},
                "anthropic": {
                    "api_key": "$ANTHROPIC_API_KEY",
                    "models": [{"id": "claude-big", "name": "My Claude"}]
                }
            }
        }"#,
    )?;

    let resolved = Loader::default()
        .with_global_path(dir.path().join("global/matrix.json"))
        .with_working_dir(dir.path().join("repo/src"))
        .with_resolver(env(&[("OPENAI_API_KEY", "sk-openai")]))
        .with_provider_sync(ProviderSync::new(&data_dir).with_url(server.uri()))
        .load(&CancellationToken::new())
        .await?;

    let config = &resolved.config;

    // anthropic key is undefined: dropped, load still succeeds
    assert!(!config.providers.contains_key("anthropic"));

    let openai = &config.providers["openai"];
    assert_eq!(openai.credential, Some(Credential::ApiKey("sk-openai".into())));
    assert_eq!(openai.base_url, "https://api.openai.com/v1");
    assert_eq!(openai.name, "OpenAI");

    // defaults come from the only usable provider
    assert_eq!(config.models[&Tier::Large].model, "gpt-big");
    assert_eq!(config.models[&Tier::Small].model, "gpt-small");
    assert_eq!(
        config.model("openai", "gpt-big").map(|m| m.context_window),
        Some(200_000)
    );

    // fetched metadata was cached
    assert!(data_dir.join("providers.json").is_file());
    assert_eq!(resolved.known_providers.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_project_file_found_upward_and_wins() -> Result<()> {
    let dir = TempDir::new()?;
    write(
        &dir.path().join("global/matrix.json"),
        r#"{
            "models": {"large": {"model": "gpt-big", "provider": "openai"}},
            "providers": {"openai": {"api_key": "sk-1"}, "anthropic": {"api_key": "sk-2"}}
        }"#,
    )?;
    write(
        &dir.path().join("repo/.matrix.json"),
        r#"{"models": {"large": {"model": "claude-big", "provider": "anthropic", "think": true}}}"#,
    )?;
    std::fs::create_dir_all(dir.path().join("repo/a/b"))?;

    let resolved = Loader::default()
        .with_global_path(dir.path().join("global/matrix.json"))
        .with_working_dir(dir.path().join("repo/a/b"))
        .with_resolver(env(&[]))
        .with_known_providers(catalog())
        .load(&CancellationToken::new())
        .await?;

    let large = &resolved.config.models[&Tier::Large];
    assert_eq!(large.provider, "anthropic");
    assert!(large.think);
    // no models declared by the user, so the metadata list is used
    let anthropic = &resolved.config.providers["anthropic"];
    assert_eq!(anthropic.models.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_tier_pointing_at_dropped_provider_fails() -> Result<()> {
    let dir = TempDir::new()?;
    write(
        &dir.path().join("global/matrix.json"),
        r#"{
            "models": {"large": {"model": "claude-big", "provider": "anthropic"}},
            "providers": {"anthropic": {"api_key": "$ANTHROPIC_API_KEY"}}
        }"#,
    )?;

    let err = Loader::default()
        .with_global_path(dir.path().join("global/matrix.json"))
        .with_working_dir(dir.path())
        .with_resolver(env(&[]))
        .with_known_providers(catalog())
        .load(&CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "tier large: provider \"anthropic\" not configured"
    );
    Ok(())
}

#[tokio::test]
async fn test_load_then_save_round_trips_templates() -> Result<()> {
    let dir = TempDir::new()?;
    let global = dir.path().join("global/matrix.json");
    write(
        &global,
        r#"{"providers": {"openai": {"api_key": "$OPENAI_API_KEY"}}}"#,
    )?;

    let resolved = Loader::default()
        .with_global_path(&global)
        .with_working_dir(dir.path())
        .with_resolver(env(&[("OPENAI_API_KEY", "sk-secret")]))
        .with_known_providers(catalog())
        .load(&CancellationToken::new())
        .await?;

    let out = dir.path().join("saved.json");
    save_config(&resolved.config, &out)?;

    let raw = std::fs::read_to_string(&out)?;
    assert!(!raw.contains("sk-secret"));
    let saved = read_config_file(&out)?;
    assert_eq!(saved.providers["openai"].api_key, "$OPENAI_API_KEY");
    assert_eq!(saved.models[&Tier::Large].model, "gpt-big");
    Ok(())
}
