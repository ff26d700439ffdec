//! Model construction for Matrix.
//!
//! Turns a resolved [`matrix_config::Config`] into ready-to-use model handles:
//!
//! ```text
//!   tier ──► SelectedModel ──► ProviderConfig ──► provider handle ──► LanguageModel
//!            (tier.rs)         (tier.rs)          (builder.rs, cached by id)
//! ```
//!
//! Provider handles are Anthropic or OpenAI-compatible HTTP clients with the
//! credential and headers applied; sending and parsing completions is left to
//! the caller.

pub mod builder;
pub mod error;
pub mod provider;
pub mod tier;

// Provider implementations
pub mod anthropic;
pub mod openai;

pub use builder::{Builder, Model, build_provider};
pub use error::{LlmError, Result};
pub use provider::{LanguageModel, LanguageModelProvider, SharedProvider};
pub use tier::{model_for_tier, provider_for_model, validate_config};

pub use anthropic::{AnthropicConfig, AnthropicProvider};
pub use openai::{OpenAiConfig, OpenAiProvider};
