//! Error types for the LLM crate.

use matrix_config::Tier;
use thiserror::Error;

/// Result type alias using the LLM error type.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Error type for tier resolution and provider construction.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No model selected for a required tier.
    #[error("{0} model not configured")]
    TierNotConfigured(Tier),

    /// A selection names a provider absent from the config.
    #[error("provider \"{0}\" not configured")]
    ProviderNotConfigured(String),

    /// A selection names a disabled provider.
    #[error("provider \"{0}\" is disabled")]
    ProviderDisabled(String),

    /// The provider's type tag has no client implementation.
    #[error("unsupported provider type: \"{0}\"")]
    UnsupportedProviderType(String),

    /// A configured header name or value is not valid HTTP.
    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Internal(format!("Failed to create HTTP client: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            LlmError::TierNotConfigured(Tier::Large).to_string(),
            "large model not configured"
        );
        assert_eq!(
            LlmError::UnsupportedProviderType("bedrock".into()).to_string(),
            "unsupported provider type: \"bedrock\""
        );
    }
}
