//! CLI command handlers.

use std::path::PathBuf;

use matrix_config::{Loader, ResolvedConfig};
use tokio_util::sync::CancellationToken;

pub mod auth;
pub mod config;
pub mod providers;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Explicit config file, bypassing discovery.
    pub config_file: Option<PathBuf>,
    /// Cancelled on Ctrl-C.
    pub cancel: CancellationToken,
}

impl Context {
    /// Loader matching the config source: the explicit file alone, or discovery.
    pub fn loader(&self) -> Loader {
        match &self.config_file {
            Some(path) => Loader::for_file(path),
            None => Loader::new(),
        }
    }

    /// Load the configuration the way every command sees it.
    pub async fn load_config(&self) -> anyhow::Result<ResolvedConfig> {
        let resolved = match &self.config_file {
            Some(path) => Loader::new().load_from_file(path, &self.cancel).await?,
            None => self.loader().load(&self.cancel).await?,
        };
        Ok(resolved)
    }

    /// Data directory named by the unresolved config, or the platform default.
    pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
        let config = match &self.config_file {
            Some(path) => matrix_config::read_config_file(path)?,
            None => self.loader().load_raw()?,
        };
        Ok(config.data_dir())
    }

    /// Where setup results are written.
    pub fn target_config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config_file {
            Some(path) => Ok(path.clone()),
            None => Ok(matrix_config::global_config_path()?),
        }
    }
}

/// Show the first and last four characters of a secret.
pub fn mask_secret(value: &str) -> String {
    if value.starts_with('$') {
        return value.to_string();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "****".to_string()
    }
}
