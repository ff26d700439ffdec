//! Configuration types mapping to the JSON schema.
//!
//! ```json
//! {
//!   "models":    { "large": { "model": "...", "provider": "..." } },
//!   "providers": { "openai": { "api_key": "$OPENAI_API_KEY" } },
//!   "options":   { "data_directory": "...", "debug": false }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use matrix_oauth::OAuthToken;
use serde::{Deserialize, Serialize};

use crate::metadata::{ModelDescriptor, ProviderDescriptor, ProviderType};

// ─────────────────────────────────────────────────────────────────────────────
// Tiers
// ─────────────────────────────────────────────────────────────────────────────

/// A named capability bucket used to pick a model without hardcoding its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Complex tasks requiring full reasoning.
    Large,
    /// Simpler, faster tasks.
    Small,
}

impl Tier {
    pub const ALL: [Tier; 2] = [Tier::Large, Tier::Small];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Large => "large",
            Tier::Small => "small",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The model chosen for a tier, with per-call sampling parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectedModel {
    /// Model id as used by the provider API.
    pub model: String,
    /// Key into [`Config::providers`].
    pub provider: String,
    /// Enables extended thinking on Anthropic models.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub think: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reasoning_effort: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i64>,
    #[serde(skip_serializing_if = "is_zero")]
    pub max_tokens: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub provider_options: serde_json::Map<String, serde_json::Value>,
}

impl SelectedModel {
    pub fn new(model: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            provider: provider.into(),
            ..Default::default()
        }
    }
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

// ─────────────────────────────────────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────────────────────────────────────

/// A provider credential, classified once when the config is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Plain API key.
    ApiKey(String),
    /// Pre-formatted bearer token (the key was stored as `Bearer <token>`).
    Bearer(String),
    /// OAuth token pair from the subscription login.
    OAuth(OAuthToken),
}

impl Credential {
    /// Classify a resolved key string.
    pub fn from_api_key(key: &str) -> Option<Self> {
        if key.is_empty() {
            None
        } else if let Some(token) = key.strip_prefix("Bearer ") {
            Some(Credential::Bearer(token.to_string()))
        } else {
            Some(Credential::ApiKey(key.to_string()))
        }
    }

    /// Whether an OAuth credential is within its refresh window.
    pub fn needs_refresh(&self) -> bool {
        matches!(self, Credential::OAuth(token) if token.is_expired())
    }
}

/// One provider's authentication and connection settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<ProviderType>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base_url: String,
    /// Key as written by the user; may be a `$VAR` template.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthToken>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disable: bool,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub extra_headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelDescriptor>,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub provider_options: serde_json::Map<String, serde_json::Value>,

    /// Resolved credential. Never persisted.
    #[serde(skip)]
    pub credential: Option<Credential>,
}

impl ProviderConfig {
    /// Whether the entry carries something worth persisting.
    pub fn has_stored_credential(&self) -> bool {
        !self.api_key.is_empty() || self.oauth.is_some()
    }

    /// Whether the provider can be selected for a tier.
    pub fn is_usable(&self) -> bool {
        !self.disable && self.credential.is_some()
    }

    /// Find a model's metadata by id.
    pub fn model(&self, model_id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == model_id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Application settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Files to load as context.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub context_paths: Vec<String>,
    /// Directory for application data (metadata cache, logs).
    #[serde(
        rename = "data_directory",
        skip_serializing_if = "Option::is_none"
    )]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub debug: bool,
}

impl Options {
    /// Overlay `other`: non-empty lists, set paths and true flags win.
    pub fn merge(&mut self, other: Options) {
        if !other.context_paths.is_empty() {
            self.context_paths = other.context_paths;
        }
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.debug {
            self.debug = true;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (global or project) can
/// be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub models: BTreeMap<Tier, SelectedModel>,
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
}

impl Config {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Tiers and providers are replaced per key; unmatched keys are kept.
    pub fn merge(&mut self, other: Config) {
        for (tier, model) in other.models {
            self.models.insert(tier, model);
        }

        for (id, provider) in other.providers {
            self.providers.insert(id, provider);
        }

        let mut options = self.options.take().unwrap_or_default();
        options.merge(other.options.unwrap_or_default());
        self.options = Some(options);
    }

    /// Options, normalized to an empty block if unset.
    pub fn options_mut(&mut self) -> &mut Options {
        self.options.get_or_insert_with(Options::default)
    }

    pub fn debug(&self) -> bool {
        self.options.as_ref().is_some_and(|o| o.debug)
    }

    /// Configured data directory, or the platform default.
    pub fn data_dir(&self) -> PathBuf {
        self.options
            .as_ref()
            .and_then(|o| o.data_dir.clone())
            .unwrap_or_else(crate::discovery::default_data_dir)
    }

    /// Find a model's metadata within a provider's model list.
    pub fn model(&self, provider_id: &str, model_id: &str) -> Option<&ModelDescriptor> {
        self.providers.get(provider_id)?.model(model_id)
    }
}

/// A loaded config together with the metadata it was resolved against.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: Config,
    pub known_providers: Vec<ProviderDescriptor>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
