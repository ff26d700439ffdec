//! OAuth 2.0 PKCE credential flow for Claude subscription authentication.
//!
//! Lets Matrix use a Claude subscription instead of a separate API key.
//!
//! # Components
//!
//! - [`oauth`]: PKCE flow: challenge generation, authorization URL, token exchange/refresh
//! - [`token`]: Token bookkeeping and early-refresh expiry test
//! - [`flow`]: UI-independent state machine driving the interactive login

pub mod error;
pub mod flow;
pub mod oauth;
pub mod token;

pub use error::{OAuthError, Result};
pub use flow::{FlowAction, FlowState, OAuthFlow, Validation};
pub use oauth::{
    OAuthConfig, PkceChallenge, authorization_url, exchange_code, parse_code, refresh_token,
};
pub use token::OAuthToken;
