//! Provider metadata: the catalog of known providers and their models.
//!
//! Obtained through a fallback chain, first success wins:
//! 1. Fetch from the catwalk endpoint (`CATWALK_URL` or the default), then
//!    best-effort refresh the on-disk cache
//! 2. The on-disk cache, if younger than [`CACHE_MAX_AGE`]
//! 3. The dataset bundled into the binary

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{ConfigError, Result};

/// Cache file name within the data directory.
pub const PROVIDERS_CACHE_FILE: &str = "providers.json";

/// Default metadata service.
pub const DEFAULT_CATWALK_URL: &str = "https://catwalk.charm.sh";

/// Environment variable overriding the metadata service URL.
pub const CATWALK_URL_ENV: &str = "CATWALK_URL";

/// Cached metadata older than this is ignored.
pub const CACHE_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Timeout for a single metadata request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

static EMBEDDED_JSON: &str = include_str!("../data/providers.json");

static EMBEDDED: LazyLock<Vec<ProviderDescriptor>> =
    LazyLock::new(|| match serde_json::from_str(EMBEDDED_JSON) {
        Ok(providers) => providers,
        Err(e) => {
            tracing::error!(error = %e, "bundled provider metadata is corrupt");
            Vec::new()
        }
    });

// ─────────────────────────────────────────────────────────────────────────────
// Descriptors
// ─────────────────────────────────────────────────────────────────────────────

/// Wire protocol spoken by a provider.
///
/// Unknown tags from newer metadata are kept verbatim in [`ProviderType::Other`]
/// so they survive a cache round trip and surface in build errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderType {
    OpenAi,
    OpenAiCompat,
    Anthropic,
    Gemini,
    Azure,
    Bedrock,
    VertexAi,
    OpenRouter,
    Other(String),
}

impl ProviderType {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderType::OpenAi => "openai",
            ProviderType::OpenAiCompat => "openai-compat",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Gemini => "gemini",
            ProviderType::Azure => "azure",
            ProviderType::Bedrock => "bedrock",
            ProviderType::VertexAi => "google-vertex",
            ProviderType::OpenRouter => "openrouter",
            ProviderType::Other(tag) => tag,
        }
    }
}

impl From<String> for ProviderType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "openai" => ProviderType::OpenAi,
            "openai-compat" => ProviderType::OpenAiCompat,
            "anthropic" => ProviderType::Anthropic,
            "gemini" => ProviderType::Gemini,
            "azure" => ProviderType::Azure,
            "bedrock" => ProviderType::Bedrock,
            "google-vertex" => ProviderType::VertexAi,
            "openrouter" => ProviderType::OpenRouter,
            _ => ProviderType::Other(tag),
        }
    }
}

impl From<ProviderType> for String {
    fn from(t: ProviderType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive data about one model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub cost_per_1m_in: f64,
    pub cost_per_1m_out: f64,
    pub cost_per_1m_in_cached: f64,
    pub cost_per_1m_out_cached: f64,
    pub context_window: u64,
    pub default_max_tokens: u64,
    pub can_reason: bool,
    pub has_reasoning_efforts: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_reasoning_effort: Option<String>,
    pub supports_attachments: bool,
}

/// Descriptive data about one provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<ProviderType>,
    /// Conventional key template, e.g. `$OPENAI_API_KEY`.
    pub api_key: String,
    pub api_endpoint: String,
    pub default_large_model_id: String,
    pub default_small_model_id: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub default_headers: HashMap<String, String>,
    pub models: Vec<ModelDescriptor>,
}

/// Timestamped metadata snapshot persisted on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersCache {
    pub updated_at: DateTime<Utc>,
    pub providers: Vec<ProviderDescriptor>,
}

impl ProvidersCache {
    /// Whether the snapshot is younger than [`CACHE_MAX_AGE`] at `now`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.updated_at);
        age.num_seconds() < CACHE_MAX_AGE.as_secs() as i64
    }
}

/// The bundled, version-pinned metadata.
pub fn embedded_providers() -> Vec<ProviderDescriptor> {
    EMBEDDED.clone()
}

// ─────────────────────────────────────────────────────────────────────────────
// Synchronizer
// ─────────────────────────────────────────────────────────────────────────────

/// Where [`ProviderSync::update`] takes its data from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSource {
    Embedded,
    Url(String),
    File(PathBuf),
}

impl ProviderSource {
    /// `"embedded"`, an `http(s)://` URL, or otherwise a local file path.
    pub fn parse(source: &str) -> Self {
        if source == "embedded" {
            ProviderSource::Embedded
        } else if source.starts_with("http://") || source.starts_with("https://") {
            ProviderSource::Url(source.to_string())
        } else {
            ProviderSource::File(PathBuf::from(source))
        }
    }
}

/// Fetches, caches and falls back for provider metadata.
#[derive(Debug, Clone)]
pub struct ProviderSync {
    url: String,
    cache_path: PathBuf,
    http: reqwest::Client,
}

impl ProviderSync {
    /// Synchronizer caching under `data_dir`, using `CATWALK_URL` if set.
    pub fn new(data_dir: &Path) -> Self {
        let url = std::env::var(CATWALK_URL_ENV)
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_CATWALK_URL.to_string());
        Self {
            url,
            cache_path: data_dir.join(PROVIDERS_CACHE_FILE),
            http: reqwest::Client::new(),
        }
    }

    /// Override the metadata service URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Run the fallback chain. Never fails; the embedded set is the floor.
    pub async fn load(&self, cancel: &CancellationToken) -> Vec<ProviderDescriptor> {
        match self.fetch(&self.url, cancel).await {
            Ok(providers) => {
                if let Err(e) = save_cache(&self.cache_path, &providers) {
                    tracing::warn!(error = %e, "failed to write provider metadata cache");
                }
                return providers;
            }
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "provider metadata fetch failed");
            }
        }

        match load_cache(&self.cache_path) {
            Ok(cache) if cache.is_fresh_at(Utc::now()) => {
                tracing::debug!(path = %self.cache_path.display(), "using cached provider metadata");
                return cache.providers;
            }
            Ok(cache) => {
                tracing::debug!(updated_at = %cache.updated_at, "provider metadata cache is stale");
            }
            Err(e) => {
                tracing::debug!(error = %e, "no usable provider metadata cache");
            }
        }

        tracing::info!("using bundled provider metadata");
        embedded_providers()
    }

    /// Force a refresh from `source` and write it to the cache.
    pub async fn update(
        &self,
        source: &ProviderSource,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProviderDescriptor>> {
        let providers = match source {
            ProviderSource::Embedded => embedded_providers(),
            ProviderSource::Url(url) => self.fetch(url, cancel).await?,
            ProviderSource::File(path) => {
                let contents =
                    std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
                        path: path.display().to_string(),
                        source: e,
                    })?;
                serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
                    path: path.display().to_string(),
                    source: e,
                })?
            }
        };

        save_cache(&self.cache_path, &providers)?;
        tracing::info!(
            count = providers.len(),
            path = %self.cache_path.display(),
            "provider metadata updated"
        );
        Ok(providers)
    }

    async fn fetch(
        &self,
        base_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProviderDescriptor>> {
        let url = format!("{}/providers", base_url.trim_end_matches('/'));
        let request = async {
            let response = self
                .http
                .get(&url)
                .timeout(FETCH_TIMEOUT)
                .send()
                .await
                .map_err(|e| ConfigError::Metadata(format!("request to {} failed: {}", url, e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ConfigError::Metadata(format!(
                    "{} returned HTTP {}",
                    url, status
                )));
            }

            response
                .json::<Vec<ProviderDescriptor>>()
                .await
                .map_err(|e| ConfigError::Metadata(format!("invalid response from {}: {}", url, e)))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ConfigError::Cancelled),
            result = request => result,
        }
    }
}

/// Read a metadata cache file.
pub fn load_cache(path: &Path) -> Result<ProvidersCache> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })
}

/// Write `providers` to `path` stamped with the current time.
///
/// Creates parent directories if they don't exist.
pub fn save_cache(path: &Path, providers: &[ProviderDescriptor]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let cache = ProvidersCache {
        updated_at: Utc::now(),
        providers: providers.to_vec(),
    };
    let contents = serde_json::to_string_pretty(&cache)?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
