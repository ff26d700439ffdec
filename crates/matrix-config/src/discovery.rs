//! Config file discovery and layered loading.
//!
//! Resolution order (later overrides earlier):
//! 1. `<config dir>/matrix/matrix.json` (global, per user)
//! 2. `matrix.json` or `.matrix.json` in the working directory or the nearest
//!    ancestor that has one (project)
//!
//! After merging, defaults are applied, provider metadata is loaded and every
//! provider entry is resolved against it. Tiers are then chosen or validated.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use crate::configure::{configure_default_models, configure_providers};
use crate::env::EnvResolver;
use crate::metadata::{ProviderDescriptor, ProviderSync};
use crate::types::{Config, ResolvedConfig};
use crate::{ConfigError, Result};

/// Config filename, both globally and per project.
pub const CONFIG_FILE: &str = "matrix.json";

/// Hidden variant of the project config filename.
pub const HIDDEN_CONFIG_FILE: &str = ".matrix.json";

/// Application name for platform directory resolution.
const APP_NAME: &str = "matrix";

/// Environment variable to override the config directory.
///
/// When set, this takes precedence over the platform default.
pub const CONFIG_DIR_ENV: &str = "MATRIX_CONFIG_DIR";

/// Get the config directory for matrix.
///
/// Checks `MATRIX_CONFIG_DIR` first, then falls back to the platform default
/// (`~/.config/matrix` on Linux, `~/Library/Application Support/matrix` on macOS).
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Path of the global config file.
pub fn global_config_path() -> Result<PathBuf> {
    config_dir()
        .map(|d| d.join(CONFIG_FILE))
        .ok_or(ConfigError::NoConfigDir)
}

/// Platform data directory for matrix, used when `options.data_directory` is unset.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from(".matrix"))
}

/// Search `start` and each ancestor for a project config file.
///
/// At each level `matrix.json` is checked before `.matrix.json`. Returns the
/// first match, or `None` after reaching the filesystem root.
pub fn find_project_config(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        for name in [CONFIG_FILE, HIDDEN_CONFIG_FILE] {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Read and parse one config file without any resolution.
pub fn read_config_file(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Config::from_json(&contents).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })
}

/// Builder for a configuration load.
///
/// Every environment-dependent input can be injected so loads are
/// reproducible in tests.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    global_path: Option<PathBuf>,
    working_dir: Option<PathBuf>,
    resolver: Option<EnvResolver>,
    provider_sync: Option<ProviderSync>,
    known_providers: Option<Vec<ProviderDescriptor>>,
}

impl Loader {
    /// Loader using the platform global path and the process working directory.
    pub fn new() -> Self {
        Self {
            global_path: global_config_path().ok(),
            working_dir: std::env::current_dir().ok(),
            ..Default::default()
        }
    }

    /// Loader reading only `path`, with no project discovery.
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        Self::default().with_global_path(path)
    }

    pub fn with_global_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_resolver(mut self, resolver: EnvResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_provider_sync(mut self, sync: ProviderSync) -> Self {
        self.provider_sync = Some(sync);
        self
    }

    /// Use a fixed metadata set instead of running the synchronizer.
    pub fn with_known_providers(mut self, providers: Vec<ProviderDescriptor>) -> Self {
        self.known_providers = Some(providers);
        self
    }

    pub fn global_path(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Load the global file, overlay the project file, then resolve.
    ///
    /// A missing file is skipped; an unreadable or malformed one fails the load.
    pub async fn load(&self, cancel: &CancellationToken) -> Result<ResolvedConfig> {
        let config = self.load_raw()?;
        self.resolve(config, cancel).await
    }

    /// The merged global and project files, before any resolution.
    pub fn load_raw(&self) -> Result<Config> {
        let mut config = Config::new();

        if let Some(path) = &self.global_path
            && path.is_file()
        {
            tracing::debug!(path = %path.display(), "loading global config");
            config.merge(read_config_file(path)?);
        }

        if let Some(path) = self.working_dir.as_deref().and_then(find_project_config) {
            tracing::debug!(path = %path.display(), "loading project config");
            config.merge(read_config_file(&path)?);
        }

        Ok(config)
    }

    /// Load a single file, skipping discovery and merging.
    pub async fn load_from_file(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<ResolvedConfig> {
        let config = read_config_file(path)?;
        self.resolve(config, cancel).await
    }

    async fn resolve(&self, mut config: Config, cancel: &CancellationToken) -> Result<ResolvedConfig> {
        apply_defaults(&mut config);

        let known_providers = match &self.known_providers {
            Some(providers) => providers.clone(),
            None => {
                let sync = self
                    .provider_sync
                    .clone()
                    .unwrap_or_else(|| ProviderSync::new(&config.data_dir()));
                sync.load(cancel).await
            }
        };
        if cancel.is_cancelled() {
            return Err(ConfigError::Cancelled);
        }

        let resolver = self.resolver.clone().unwrap_or_else(EnvResolver::from_env);
        configure_providers(&mut config, &known_providers, &resolver);
        configure_default_models(&mut config, &known_providers)?;

        tracing::debug!(
            providers = config.providers.len(),
            tiers = config.models.len(),
            "configuration loaded"
        );
        Ok(ResolvedConfig {
            config,
            known_providers,
        })
    }
}

fn apply_defaults(config: &mut Config) {
    let options = config.options_mut();
    if options.data_dir.is_none() {
        options.data_dir = Some(default_data_dir());
    }
}
