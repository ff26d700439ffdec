//! Resolving user provider entries against provider metadata and choosing tiers.

use std::collections::HashSet;

use crate::env::EnvResolver;
use crate::metadata::ProviderDescriptor;
use crate::types::{Config, Credential, ProviderConfig, SelectedModel, Tier};
use crate::{ConfigError, Result};

/// Resolve credentials and fill metadata defaults for every configured provider.
///
/// Providers whose key template cannot be resolved, or resolves to an empty
/// string, are removed from `config`. Removal is logged, never an error.
pub fn configure_providers(
    config: &mut Config,
    known: &[ProviderDescriptor],
    resolver: &EnvResolver,
) {
    let mut dropped = Vec::new();

    for (id, provider) in config.providers.iter_mut() {
        let descriptor = known.iter().find(|d| &d.id == id);
        if let Some(descriptor) = descriptor {
            apply_metadata(provider, descriptor, resolver);
        }
        if provider.id.is_empty() {
            provider.id = id.clone();
        }

        if let Err(e) = resolve_connection(provider, resolver) {
            tracing::warn!(provider = %id, error = %e, "dropping provider");
            dropped.push(id.clone());
        }
    }

    for id in dropped {
        config.providers.remove(&id);
    }
}

fn apply_metadata(
    provider: &mut ProviderConfig,
    descriptor: &ProviderDescriptor,
    resolver: &EnvResolver,
) {
    if provider.name.is_empty() {
        provider.name = descriptor.name.clone();
    }
    if provider.provider_type.is_none() {
        provider.provider_type = descriptor.provider_type.clone();
    }
    if provider.base_url.is_empty() {
        provider.base_url = resolver.resolve_or_empty(&descriptor.api_endpoint);
    }
    for (name, value) in &descriptor.default_headers {
        provider
            .extra_headers
            .entry(name.clone())
            .or_insert_with(|| value.clone());
    }

    let declared: HashSet<String> = provider.models.iter().map(|m| m.id.clone()).collect();
    provider.models.extend(
        descriptor
            .models
            .iter()
            .filter(|m| !declared.contains(&m.id))
            .cloned(),
    );
}

/// Expand the base URL and classify the credential.
fn resolve_connection(provider: &mut ProviderConfig, resolver: &EnvResolver) -> Result<()> {
    provider.base_url = resolver.resolve(&provider.base_url)?;

    provider.credential = if let Some(token) = &provider.oauth {
        Some(Credential::OAuth(token.clone()))
    } else if provider.api_key.is_empty() {
        None
    } else {
        let key = resolver.resolve(&provider.api_key)?;
        match Credential::from_api_key(&key) {
            Some(credential) => Some(credential),
            None => return Err(ConfigError::EmptyApiKey(provider.id.clone())),
        }
    };
    Ok(())
}

/// Pick default tiers when none are configured, otherwise validate them.
///
/// Defaults come from the first provider, in metadata order, that is enabled
/// and holds a credential, and declares at least one default model id.
pub fn configure_default_models(config: &mut Config, known: &[ProviderDescriptor]) -> Result<()> {
    if !config.models.is_empty() {
        return validate_models(config);
    }

    for descriptor in known {
        let Some(provider) = config.providers.get(&descriptor.id) else {
            continue;
        };
        if !provider.is_usable() {
            continue;
        }

        let mut assigned = false;
        for (tier, model_id) in [
            (Tier::Large, &descriptor.default_large_model_id),
            (Tier::Small, &descriptor.default_small_model_id),
        ] {
            if !model_id.is_empty() {
                config
                    .models
                    .insert(tier, SelectedModel::new(model_id.clone(), descriptor.id.clone()));
                assigned = true;
            }
        }

        if assigned {
            tracing::info!(provider = %descriptor.id, "selected default models");
            return Ok(());
        }
    }

    Err(ConfigError::NoProvidersConfigured)
}

/// Check that each configured tier references an enabled provider.
pub fn validate_models(config: &Config) -> Result<()> {
    for tier in Tier::ALL {
        let Some(selected) = config.models.get(&tier) else {
            continue;
        };
        match config.providers.get(&selected.provider) {
            None => {
                return Err(ConfigError::ProviderNotConfigured {
                    tier,
                    provider: selected.provider.clone(),
                });
            }
            Some(p) if p.disable => {
                return Err(ConfigError::ProviderDisabled {
                    tier,
                    provider: selected.provider.clone(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}
