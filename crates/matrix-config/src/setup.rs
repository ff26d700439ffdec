//! First-run detection.

use tokio_util::sync::CancellationToken;

use crate::discovery::Loader;
use crate::types::ResolvedConfig;

/// Whether the user has never completed setup.
///
/// True when the global file is missing, the configuration fails to load, or
/// no enabled provider holds a credential.
pub async fn is_first_run(loader: &Loader, cancel: &CancellationToken) -> bool {
    match loader.global_path() {
        Some(path) if path.is_file() => {}
        _ => return true,
    }

    match loader.load(cancel).await {
        Ok(resolved) => !resolved.config.providers.values().any(|p| p.is_usable()),
        Err(e) => {
            tracing::debug!(error = %e, "config did not load; treating as first run");
            true
        }
    }
}

/// Whether a loaded configuration still needs the setup flow.
///
/// True when no tier is selected, or any tier points at a provider that is
/// missing, disabled or has no credential.
pub fn needs_setup(resolved: &ResolvedConfig) -> bool {
    let config = &resolved.config;
    if config.models.is_empty() {
        return true;
    }
    config.models.values().any(|selected| {
        config
            .providers
            .get(&selected.provider)
            .is_none_or(|p| !p.is_usable())
    })
}
