//! Configuration error types.

use crate::types::Tier;

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to write a config file.
    #[error("failed to write config file '{path}': {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse JSON.
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    /// Failed to serialize config.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    /// One or more `$VAR` references have no value.
    #[error("undefined environment variables: {}", .0.join(", "))]
    UndefinedVariables(Vec<String>),

    /// An API key template expanded to nothing.
    #[error("provider \"{0}\" has an empty API key")]
    EmptyApiKey(String),

    /// No tier configured and no provider qualified for defaults.
    #[error("no providers configured with valid API keys")]
    NoProvidersConfigured,

    /// A tier references a provider that is not configured.
    #[error("tier {tier}: provider \"{provider}\" not configured")]
    ProviderNotConfigured { tier: Tier, provider: String },

    /// A tier references a disabled provider.
    #[error("tier {tier}: provider \"{provider}\" is disabled")]
    ProviderDisabled { tier: Tier, provider: String },

    /// A provider id that is not present in the config.
    #[error("provider \"{0}\" not found")]
    UnknownProvider(String),

    /// Provider metadata could not be fetched or parsed.
    #[error("provider metadata: {0}")]
    Metadata(String),

    /// Platform config directory could not be determined.
    #[error("could not determine the user config directory")]
    NoConfigDir,

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// Token refresh failed.
    #[error(transparent)]
    OAuth(#[from] matrix_oauth::OAuthError),
}
