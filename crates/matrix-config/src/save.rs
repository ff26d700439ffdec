//! Persisting configuration back to disk.
//!
//! [`save_config`] writes the user-authored subset of a [`Config`]: tier
//! selections, options and, for each provider holding a key or an OAuth token,
//! those two fields. Key templates such as `$OPENAI_API_KEY` are written back
//! as-is; resolved values never reach the file.
//!
//! The setup helpers and [`save_provider_oauth`] instead edit the existing file
//! as raw JSON and touch only the keys they set.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use matrix_oauth::{OAuthConfig, OAuthToken};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::discovery::global_config_path;
use crate::types::{Config, Credential, Options, SelectedModel, Tier};
use crate::{ConfigError, Result};

#[derive(Serialize)]
struct PersistedConfig<'a> {
    #[serde(skip_serializing_if = "no_models")]
    models: &'a BTreeMap<Tier, SelectedModel>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    providers: HashMap<&'a str, PersistedProvider<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a Options>,
}

#[derive(Serialize)]
struct PersistedProvider<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    oauth: Option<&'a OAuthToken>,
    #[serde(skip_serializing_if = "no_key")]
    api_key: &'a str,
}

fn no_models(models: &&BTreeMap<Tier, SelectedModel>) -> bool {
    models.is_empty()
}

fn no_key(key: &&str) -> bool {
    key.is_empty()
}

/// Write `config` to `path`.
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let persisted = PersistedConfig {
        models: &config.models,
        providers: config
            .providers
            .iter()
            .filter(|(_, p)| p.has_stored_credential())
            .map(|(id, p)| {
                (
                    id.as_str(),
                    PersistedProvider {
                        oauth: p.oauth.as_ref(),
                        api_key: &p.api_key,
                    },
                )
            })
            .collect(),
        options: config.options.as_ref(),
    };

    write_config(path, &serde_json::to_string_pretty(&persisted)?)?;
    tracing::debug!(path = %path.display(), "saved config");
    Ok(())
}

/// Write `config` to the global config file.
pub fn save(config: &Config) -> Result<()> {
    save_config(config, &global_config_path()?)
}

/// Record an API-key setup: the provider plus both tiers pointing at it.
///
/// `api_key` may be a literal key or a `$VAR` reference. The file at `path` is
/// edited in place: other providers and options are kept exactly as written,
/// and the target provider keeps its non-credential fields.
pub fn save_wizard_result(
    path: &Path,
    provider_id: &str,
    api_key: &str,
    large_model: &str,
    small_model: &str,
) -> Result<()> {
    edit_config_file(path, |doc| {
        update_provider(doc, provider_id, |entry| {
            entry.remove("oauth");
            entry.insert("api_key".to_string(), Value::String(api_key.to_string()));
            Ok(())
        })?;
        select_tiers(doc, provider_id, large_model, small_model)
    })
}

/// Record an OAuth setup: the provider with its token plus both tiers.
pub fn save_wizard_result_with_oauth(
    path: &Path,
    provider_id: &str,
    token: &OAuthToken,
    large_model: &str,
    small_model: &str,
) -> Result<()> {
    edit_config_file(path, |doc| {
        update_provider(doc, provider_id, |entry| {
            entry.remove("api_key");
            entry.insert("oauth".to_string(), serde_json::to_value(token)?);
            Ok(())
        })?;
        select_tiers(doc, provider_id, large_model, small_model)
    })
}

/// Replace the stored OAuth token of one provider, leaving the rest of the file as is.
pub fn save_provider_oauth(path: &Path, provider_id: &str, token: &OAuthToken) -> Result<()> {
    edit_config_file(path, |doc| {
        update_provider(doc, provider_id, |entry| {
            entry.insert("oauth".to_string(), serde_json::to_value(token)?);
            Ok(())
        })
    })
}

fn select_tiers(
    doc: &mut Map<String, Value>,
    provider_id: &str,
    large_model: &str,
    small_model: &str,
) -> Result<()> {
    update_object(doc, "models", |models| {
        for (tier, model) in [(Tier::Large, large_model), (Tier::Small, small_model)] {
            models.insert(
                tier.as_str().to_string(),
                serde_json::to_value(SelectedModel::new(model, provider_id))?,
            );
        }
        Ok(())
    })
}

fn update_provider(
    doc: &mut Map<String, Value>,
    provider_id: &str,
    edit: impl FnOnce(&mut Map<String, Value>) -> Result<()>,
) -> Result<()> {
    update_object(doc, "providers", |providers| {
        update_object(providers, provider_id, edit)
    })
}

/// Edit the object under `key`, starting from an empty one when absent.
fn update_object(
    map: &mut Map<String, Value>,
    key: &str,
    edit: impl FnOnce(&mut Map<String, Value>) -> Result<()>,
) -> Result<()> {
    let mut object = match map.remove(key) {
        Some(Value::Object(object)) => object,
        _ => Map::new(),
    };
    let result = edit(&mut object);
    map.insert(key.to_string(), Value::Object(object));
    result
}

/// Apply `edit` to the raw JSON document at `path` and write it back.
///
/// The document is checked against the config schema first, so a malformed
/// file is reported rather than overwritten. A missing file starts empty.
fn edit_config_file(
    path: &Path,
    edit: impl FnOnce(&mut Map<String, Value>) -> Result<()>,
) -> Result<()> {
    let mut doc = if path.is_file() {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;
        let parse_error = |e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        };
        Config::from_json(&contents).map_err(parse_error)?;
        serde_json::from_str(&contents).map_err(parse_error)?
    } else {
        Map::new()
    };

    edit(&mut doc)?;

    tracing::info!(path = %path.display(), "updating config file");
    write_config(path, &serde_json::to_string_pretty(&doc)?)
}

fn write_config(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })
}

/// Refresh a provider's OAuth token in place if it is within its refresh window.
///
/// Returns `true` when a new token was obtained. A response without a refresh
/// token keeps the previous one. The caller decides whether to persist.
pub async fn refresh_provider_token(
    config: &mut Config,
    provider_id: &str,
    oauth: &OAuthConfig,
    cancel: &CancellationToken,
) -> Result<bool> {
    let provider = config
        .providers
        .get_mut(provider_id)
        .ok_or_else(|| ConfigError::UnknownProvider(provider_id.to_string()))?;

    let Some(current) = provider.oauth.as_ref() else {
        return Ok(false);
    };
    if !current.is_expired() {
        return Ok(false);
    }

    tracing::info!(provider = %provider_id, "refreshing expired OAuth token");
    let mut token = matrix_oauth::refresh_token(oauth, &current.refresh_token, cancel).await?;
    if token.refresh_token.is_empty() {
        token.refresh_token = current.refresh_token.clone();
    }

    provider.credential = Some(Credential::OAuth(token.clone()));
    provider.oauth = Some(token);
    Ok(true)
}
