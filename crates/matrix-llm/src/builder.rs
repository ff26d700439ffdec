//! Building session models from a resolved configuration.
//!
//! A [`Builder`] lives for one session. Provider handles are cached by provider
//! id, so tiers sharing a provider share one HTTP client.

use std::collections::HashMap;
use std::sync::Arc;

use matrix_config::{
    Config, Credential, ModelDescriptor, ProviderConfig, ProviderType, SelectedModel, Tier,
};

use crate::anthropic::{
    AnthropicConfig, AnthropicProvider, INTERLEAVED_THINKING_BETA, OAUTH_BETA, append_beta,
};
use crate::error::{LlmError, Result};
use crate::openai::{OpenAiConfig, OpenAiProvider};
use crate::provider::{LanguageModel, SharedProvider};
use crate::tier::{model_for_tier, provider_for_model};

/// A tier's model ready for use.
#[derive(Debug, Clone)]
pub struct Model {
    pub model: LanguageModel,
    /// Catalog entry for the model; zero-valued when the provider lists none.
    pub metadata: ModelDescriptor,
    pub selection: SelectedModel,
}

/// Builds models for tiers, caching provider handles by provider id.
pub struct Builder<'a> {
    config: &'a Config,
    providers: HashMap<String, SharedProvider>,
}

impl<'a> Builder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            providers: HashMap::new(),
        }
    }

    /// Build the large and small models.
    ///
    /// The large tier is required. Without a small tier the large model is
    /// reused for it.
    pub fn build_models(&mut self) -> Result<(Model, Model)> {
        let large = self.build_model(Tier::Large)?;
        let small = if self.config.models.contains_key(&Tier::Small) {
            self.build_model(Tier::Small)?
        } else {
            tracing::debug!("small tier not configured, reusing large model");
            large.clone()
        };
        Ok((large, small))
    }

    /// Build the model for one tier.
    pub fn build_model(&mut self, tier: Tier) -> Result<Model> {
        let config = self.config;
        let selected = model_for_tier(config, tier)?;
        let provider = provider_for_model(config, selected)?;
        let handle = self.get_or_build_provider(provider, selected)?;

        let metadata = provider.model(&selected.model).cloned().unwrap_or_default();
        tracing::debug!(
            %tier,
            provider = %selected.provider,
            model = %selected.model,
            "built model"
        );
        Ok(Model {
            model: handle.language_model(&selected.model),
            metadata,
            selection: selected.clone(),
        })
    }

    /// Return the cached handle for this provider, building it on first use.
    ///
    /// The first selection built against a provider decides its
    /// selection-dependent headers.
    pub fn get_or_build_provider(
        &mut self,
        provider: &ProviderConfig,
        selected: &SelectedModel,
    ) -> Result<SharedProvider> {
        let id = if provider.id.is_empty() {
            &selected.provider
        } else {
            &provider.id
        };
        if let Some(handle) = self.providers.get(id) {
            return Ok(Arc::clone(handle));
        }

        let handle = build_provider(provider, selected)?;
        self.providers.insert(id.clone(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Number of provider handles built so far.
    pub fn cached_providers(&self) -> usize {
        self.providers.len()
    }
}

/// Construct a provider handle, dispatching on the provider type.
pub fn build_provider(provider: &ProviderConfig, selected: &SelectedModel) -> Result<SharedProvider> {
    if let Some(Credential::OAuth(token)) = &provider.credential
        && token.is_expired()
    {
        tracing::warn!(
            provider = %provider.id,
            "OAuth token is expired or about to expire; refresh before use"
        );
    }

    let mut headers = provider.extra_headers.clone();
    let kind = provider
        .provider_type
        .clone()
        .ok_or_else(|| LlmError::UnsupportedProviderType(String::new()))?;

    match kind {
        ProviderType::OpenAi | ProviderType::OpenAiCompat | ProviderType::OpenRouter => {
            let mut config = OpenAiConfig::new(kind).with_base_url(provider.base_url.clone());
            match &provider.credential {
                Some(Credential::ApiKey(key)) | Some(Credential::Bearer(key)) => {
                    config = config.with_api_key(key.clone());
                }
                Some(Credential::OAuth(token)) => {
                    config = config.with_api_key(token.access_token.clone());
                }
                None => {}
            }
            Ok(Arc::new(OpenAiProvider::new(config.with_headers(headers))?))
        }
        ProviderType::Anthropic => {
            if selected.think {
                append_beta(&mut headers, INTERLEAVED_THINKING_BETA);
            }
            let mut config = AnthropicConfig::new().with_base_url(provider.base_url.clone());
            match &provider.credential {
                Some(Credential::ApiKey(key)) => config = config.with_api_key(key.clone()),
                Some(Credential::Bearer(token)) => config = config.with_bearer_token(token.clone()),
                Some(Credential::OAuth(token)) => {
                    append_beta(&mut headers, OAUTH_BETA);
                    config = config.with_bearer_token(token.access_token.clone());
                }
                None => {}
            }
            Ok(Arc::new(AnthropicProvider::new(config.with_headers(headers))?))
        }
        other => Err(LlmError::UnsupportedProviderType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrix_oauth::OAuthToken;

    fn provider(kind: ProviderType, credential: Option<Credential>) -> ProviderConfig {
        ProviderConfig {
            id: kind.to_string(),
            provider_type: Some(kind),
            credential,
            ..Default::default()
        }
    }

    fn config_with(provider_id: &str, p: ProviderConfig) -> Config {
        let mut config = Config::new();
        config.providers.insert(provider_id.to_string(), p);
        config
    }

    #[test]
    fn test_small_falls_back_to_large() {
        let mut p = provider(ProviderType::OpenAi, Some(Credential::ApiKey("sk".into())));
        p.models = vec![ModelDescriptor {
            id: "gpt-big".into(),
            context_window: 128_000,
            ..Default::default()
        }];
        let mut config = config_with("openai", p);
        config
            .models
            .insert(Tier::Large, SelectedModel::new("gpt-big", "openai"));

        let mut builder = Builder::new(&config);
        let (large, small) = builder.build_models().unwrap();
        assert_eq!(small.selection.model, large.selection.model);
        assert_eq!(small.model.model_id(), "gpt-big");
        assert_eq!(large.metadata.context_window, 128_000);
        assert_eq!(builder.cached_providers(), 1);
    }

    #[test]
    fn test_missing_metadata_is_zero_valued() {
        let mut config = config_with(
            "openai",
            provider(ProviderType::OpenAi, Some(Credential::ApiKey("sk".into()))),
        );
        config
            .models
            .insert(Tier::Large, SelectedModel::new("unknown-model", "openai"));

        let model = Builder::new(&config).build_model(Tier::Large).unwrap();
        assert_eq!(model.metadata, ModelDescriptor::default());
    }

    #[test]
    fn test_large_tier_required() {
        let config = Config::new();
        let err = Builder::new(&config).build_models().unwrap_err();
        assert!(matches!(err, LlmError::TierNotConfigured(Tier::Large)));
    }

    #[test]
    fn test_provider_handle_cached_by_id() {
        let mut config = config_with(
            "anthropic",
            provider(ProviderType::Anthropic, Some(Credential::ApiKey("sk".into()))),
        );
        config
            .models
            .insert(Tier::Large, SelectedModel::new("claude-big", "anthropic"));
        config
            .models
            .insert(Tier::Small, SelectedModel::new("claude-small", "anthropic"));

        let mut builder = Builder::new(&config);
        let p = &config.providers["anthropic"];
        let first = builder
            .get_or_build_provider(p, &config.models[&Tier::Large])
            .unwrap();
        let second = builder
            .get_or_build_provider(p, &config.models[&Tier::Small])
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let (large, small) = builder.build_models().unwrap();
        assert_eq!(large.model.model_id(), "claude-big");
        assert_eq!(small.model.model_id(), "claude-small");
        assert_eq!(builder.cached_providers(), 1);
    }

    #[test]
    fn test_thinking_appends_beta_without_touching_config() {
        let mut p = provider(ProviderType::Anthropic, Some(Credential::ApiKey("sk".into())));
        p.extra_headers
            .insert("anthropic-beta".into(), "prompt-caching-2024-07-31".into());
        let before = p.extra_headers.clone();

        let mut selected = SelectedModel::new("claude", "anthropic");
        selected.think = true;

        let handle = build_provider(&p, &selected).unwrap();
        assert_eq!(
            handle.default_headers()["anthropic-beta"],
            "prompt-caching-2024-07-31,interleaved-thinking-2025-05-14"
        );
        assert_eq!(p.extra_headers, before);
    }

    #[test]
    fn test_bearer_key_uses_authorization() {
        let p = provider(
            ProviderType::Anthropic,
            Some(Credential::Bearer("sk-ant-oat-123".into())),
        );
        let handle = build_provider(&p, &SelectedModel::new("claude", "anthropic")).unwrap();
        let headers = handle.default_headers();
        assert_eq!(headers["authorization"], "Bearer sk-ant-oat-123");
        assert!(!headers.contains_key("x-api-key"));
    }

    #[test]
    fn test_oauth_credential_adds_oauth_beta() {
        let p = provider(
            ProviderType::Anthropic,
            Some(Credential::OAuth(OAuthToken::new("access", "refresh", 3600))),
        );
        let handle = build_provider(&p, &SelectedModel::new("claude", "anthropic")).unwrap();
        let headers = handle.default_headers();
        assert_eq!(headers["authorization"], "Bearer access");
        assert_eq!(headers["anthropic-beta"], OAUTH_BETA);
    }

    #[test]
    fn test_keyless_openai_compat_builds() {
        let mut p = provider(ProviderType::OpenAiCompat, None);
        p.base_url = "http://localhost:11434/v1".into();
        let handle = build_provider(&p, &SelectedModel::new("llama3", "ollama")).unwrap();
        assert_eq!(handle.kind(), ProviderType::OpenAiCompat);
        assert_eq!(handle.base_url(), "http://localhost:11434/v1");
        assert!(!handle.default_headers().contains_key("authorization"));
    }

    #[test]
    fn test_unsupported_type_named() {
        let p = provider(ProviderType::Bedrock, Some(Credential::ApiKey("k".into())));
        let err = build_provider(&p, &SelectedModel::new("m", "bedrock")).unwrap_err();
        assert_eq!(err.to_string(), "unsupported provider type: \"bedrock\"");

        let p = provider(
            ProviderType::Other("quantum".into()),
            Some(Credential::ApiKey("k".into())),
        );
        let err = build_provider(&p, &SelectedModel::new("m", "q")).unwrap_err();
        assert!(err.to_string().contains("quantum"));
    }
}
