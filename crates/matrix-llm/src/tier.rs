//! Resolving tiers to selections and selections to providers.

use matrix_config::{Config, ProviderConfig, SelectedModel, Tier};

use crate::error::{LlmError, Result};

/// The model selected for `tier`.
pub fn model_for_tier(config: &Config, tier: Tier) -> Result<&SelectedModel> {
    config
        .models
        .get(&tier)
        .ok_or(LlmError::TierNotConfigured(tier))
}

/// The enabled provider a selection points at.
pub fn provider_for_model<'a>(
    config: &'a Config,
    selected: &SelectedModel,
) -> Result<&'a ProviderConfig> {
    let provider = config
        .providers
        .get(&selected.provider)
        .ok_or_else(|| LlmError::ProviderNotConfigured(selected.provider.clone()))?;
    if provider.disable {
        return Err(LlmError::ProviderDisabled(selected.provider.clone()));
    }
    Ok(provider)
}

/// Check that the large tier exists and every configured tier resolves.
pub fn validate_config(config: &Config) -> Result<()> {
    model_for_tier(config, Tier::Large)?;
    for tier in Tier::ALL {
        if let Some(selected) = config.models.get(&tier) {
            provider_for_model(config, selected)?;
        }
    }
    Ok(())
}
