//! Anthropic Messages API client handle.

use std::collections::HashMap;

use matrix_config::ProviderType;
use reqwest::Client;
use reqwest::header::HeaderMap;

use crate::error::Result;
use crate::provider::{LanguageModel, LanguageModelProvider, header_map, http_client, insert_header};

/// Default API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// API version header value.
pub const API_VERSION: &str = "2023-06-01";

/// Header carrying opt-in beta features, comma separated.
pub const BETA_HEADER: &str = "anthropic-beta";

/// Beta feature enabling thinking between tool calls.
pub const INTERLEAVED_THINKING_BETA: &str = "interleaved-thinking-2025-05-14";

/// Beta feature required when authenticating with a subscription OAuth token.
pub const OAUTH_BETA: &str = "oauth-2025-04-20";

/// How requests authenticate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AnthropicAuth {
    /// No credential; for proxies that inject their own.
    #[default]
    None,
    /// `x-api-key` header.
    ApiKey(String),
    /// `Authorization: Bearer` header.
    Bearer(String),
}

/// Configuration for the Anthropic client.
#[derive(Debug, Clone, Default)]
pub struct AnthropicConfig {
    pub auth: AnthropicAuth,
    /// Base URL; the default endpoint when `None`.
    pub base_url: Option<String>,
    pub headers: HashMap<String, String>,
}

impl AnthropicConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.auth = AnthropicAuth::ApiKey(key.into());
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AnthropicAuth::Bearer(token.into());
        self
    }

    /// Set a custom base URL. Empty strings are ignored.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.is_empty() {
            self.base_url = Some(url);
        }
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

/// Add `feature` to the `anthropic-beta` header, keeping existing features.
pub fn append_beta(headers: &mut HashMap<String, String>, feature: &str) {
    let existing = headers
        .keys()
        .find(|k| k.eq_ignore_ascii_case(BETA_HEADER))
        .cloned();

    match existing {
        Some(key) => {
            if let Some(value) = headers.get_mut(&key) {
                if value.split(',').any(|f| f.trim() == feature) {
                    return;
                }
                if value.trim().is_empty() {
                    *value = feature.to_string();
                } else {
                    value.push(',');
                    value.push_str(feature);
                }
            }
        }
        None => {
            headers.insert(BETA_HEADER.to_string(), feature.to_string());
        }
    }
}

/// Anthropic client handle.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    base_url: String,
    headers: HeaderMap,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();

        let mut headers = header_map(&config.headers)?;
        if !headers.contains_key("anthropic-version") {
            insert_header(&mut headers, "anthropic-version", API_VERSION)?;
        }
        match &config.auth {
            AnthropicAuth::None => {}
            AnthropicAuth::ApiKey(key) => insert_header(&mut headers, "x-api-key", key)?,
            AnthropicAuth::Bearer(token) => {
                insert_header(&mut headers, "authorization", &format!("Bearer {}", token))?
            }
        }

        let client = http_client(headers.clone())?;
        Ok(Self {
            base_url,
            headers,
            client,
        })
    }

    /// Build the messages endpoint URL.
    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

impl LanguageModelProvider for AnthropicProvider {
    fn kind(&self) -> ProviderType {
        ProviderType::Anthropic
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn default_headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn language_model(&self, model_id: &str) -> LanguageModel {
        LanguageModel::new(
            model_id,
            ProviderType::Anthropic,
            self.messages_url(),
            self.client.clone(),
        )
    }
}
