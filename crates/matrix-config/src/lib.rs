//! Configuration system for Matrix.
//!
//! Provides JSON-based configuration with:
//! - Config file layering (global user config + project file found upward)
//! - `$VAR` expansion for API keys and base URLs
//! - Provider metadata from the catwalk service, a local cache, or the
//!   bundled dataset
//! - Default tier selection and validation
//! - Saving setup results, including OAuth tokens

pub mod configure;
pub mod discovery;
pub mod env;
pub mod error;
pub mod metadata;
pub mod save;
pub mod setup;
pub mod types;

pub use configure::{configure_default_models, configure_providers, validate_models};
pub use discovery::{
    Loader, config_dir, default_data_dir, find_project_config, global_config_path,
    read_config_file,
};
pub use env::EnvResolver;
pub use error::{ConfigError, Result};
pub use metadata::{
    ModelDescriptor, ProviderDescriptor, ProviderSource, ProviderSync, ProviderType,
    ProvidersCache, embedded_providers,
};
pub use save::{
    refresh_provider_token, save, save_config, save_provider_oauth, save_wizard_result,
    save_wizard_result_with_oauth,
};
pub use setup::{is_first_run, needs_setup};
pub use types::*;
