//! Provider client handles.
//!
//! A provider handle owns one configured HTTP client: base URL, credential
//! and headers are fixed at construction. Model handles are cheap to derive
//! from it and share the same connection pool.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use matrix_config::ProviderType;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder};

use crate::error::{LlmError, Result};

/// Default timeout for completion requests.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// A constructed provider client.
pub trait LanguageModelProvider: Send + Sync + std::fmt::Debug {
    /// Wire protocol this client speaks.
    fn kind(&self) -> ProviderType;

    /// Base URL requests are sent to.
    fn base_url(&self) -> &str;

    /// Headers attached to every request, credential included.
    fn default_headers(&self) -> &HeaderMap;

    /// Handle for a specific model id.
    fn language_model(&self, model_id: &str) -> LanguageModel;
}

/// Provider handle shared across tiers.
pub type SharedProvider = Arc<dyn LanguageModelProvider>;

/// A model on a specific provider, ready to issue requests.
#[derive(Debug, Clone)]
pub struct LanguageModel {
    model_id: String,
    provider: ProviderType,
    endpoint: String,
    client: Client,
}

impl LanguageModel {
    pub(crate) fn new(
        model_id: impl Into<String>,
        provider: ProviderType,
        endpoint: String,
        client: Client,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            provider,
            endpoint,
            client,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn provider(&self) -> &ProviderType {
        &self.provider
    }

    /// Completion endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Start a POST to the completion endpoint with auth headers applied.
    pub fn post(&self) -> RequestBuilder {
        self.client.post(&self.endpoint)
    }
}

/// Convert configured headers into a [`HeaderMap`].
pub(crate) fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        insert_header(&mut map, name, value)?;
    }
    Ok(map)
}

pub(crate) fn insert_header(map: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| LlmError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    let mut header_value = HeaderValue::from_str(value).map_err(|e| LlmError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    if header_name == reqwest::header::AUTHORIZATION || name.eq_ignore_ascii_case("x-api-key") {
        header_value.set_sensitive(true);
    }
    map.insert(header_name, header_value);
    Ok(())
}

/// Build the shared HTTP client with `headers` on every request.
pub(crate) fn http_client(headers: HeaderMap) -> Result<Client> {
    Ok(Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .default_headers(headers)
        .build()?)
}
