//! OpenAI-compatible client handle.
//!
//! Works with OpenAI itself or any service exposing the chat completions API
//! (Groq, OpenRouter, Ollama, local servers).

use std::collections::HashMap;

use matrix_config::ProviderType;
use reqwest::Client;
use reqwest::header::HeaderMap;

use crate::error::Result;
use crate::provider::{LanguageModel, LanguageModelProvider, header_map, http_client, insert_header};

/// Default OpenAI API base URL.
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

/// Configuration for an OpenAI-compatible client.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key (optional for local services like Ollama).
    pub api_key: Option<String>,
    /// Base URL; the OpenAI endpoint when `None`.
    pub base_url: Option<String>,
    pub headers: HashMap<String, String>,
    /// Reported by [`LanguageModelProvider::kind`].
    pub kind: ProviderType,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            headers: HashMap::new(),
            kind: ProviderType::OpenAi,
        }
    }
}

impl OpenAiConfig {
    pub fn new(kind: ProviderType) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
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

/// OpenAI-compatible client handle.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    kind: ProviderType,
    base_url: String,
    headers: HeaderMap,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_BASE)
            .trim_end_matches('/')
            .to_string();

        let mut headers = header_map(&config.headers)?;
        if let Some(key) = &config.api_key {
            insert_header(&mut headers, "authorization", &format!("Bearer {}", key))?;
        }

        let client = http_client(headers.clone())?;
        Ok(Self {
            kind: config.kind,
            base_url,
            headers,
            client,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl LanguageModelProvider for OpenAiProvider {
    fn kind(&self) -> ProviderType {
        self.kind.clone()
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
            self.kind.clone(),
            self.completions_url(),
            self.client.clone(),
        )
    }
}
