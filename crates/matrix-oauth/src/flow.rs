//! Interactive login as an explicit state machine.
//!
//! The flow knows nothing about terminals or widgets. A caller feeds it
//! discrete events (confirm, pasted code, validation result) and performs the
//! returned [`FlowAction`], typically by spawning [`crate::exchange_code`] and
//! reporting its result back through [`OAuthFlow::validation_completed`].
//!
//! ```text
//!  Url ──confirm──▶ Code/None ──confirm──▶ Code/Verifying ──ok──▶ Code/Valid ──confirm──▶ Complete
//!                       ▲                        │
//!                       └──── Code/Error ◀──err──┘
//! ```

use crate::error::Result;
use crate::oauth::{OAuthConfig, PkceChallenge, authorization_url};
use crate::token::OAuthToken;

/// Top-level step of the login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Authorization link generated, not yet opened.
    Url,
    /// Waiting for the user to paste the returned code.
    Code,
}

/// Validation sub-state while in [`FlowState::Code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    None,
    Verifying,
    Valid,
    Error,
}

/// What the caller should do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowAction {
    /// Nothing to do.
    Idle,
    /// Open the authorization URL in a browser.
    OpenBrowser(String),
    /// Exchange the code for tokens and report back.
    Validate { code: String, verifier: String },
    /// Login finished with this token.
    Complete(OAuthToken),
}

/// State of one interactive OAuth login.
#[derive(Debug, Clone)]
pub struct OAuthFlow {
    state: FlowState,
    validation: Validation,
    pkce: PkceChallenge,
    auth_url: String,
    code: String,
    token: Option<OAuthToken>,
    last_error: Option<String>,
}

impl OAuthFlow {
    /// Start a new login with a fresh PKCE pair.
    pub fn new(config: &OAuthConfig) -> Self {
        let pkce = PkceChallenge::generate();
        let auth_url = authorization_url(config, &pkce);
        Self {
            state: FlowState::Url,
            validation: Validation::None,
            pkce,
            auth_url,
            code: String::new(),
            token: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn validation(&self) -> Validation {
        self.validation
    }

    pub fn authorization_url(&self) -> &str {
        &self.auth_url
    }

    pub fn verifier(&self) -> &str {
        &self.pkce.verifier
    }

    /// The authorization URL without its query string, for compact display.
    pub fn display_url(&self) -> String {
        match self.auth_url.split_once('?') {
            Some((base, _)) => format!("{}...", base),
            None => self.auth_url.clone(),
        }
    }

    pub fn token(&self) -> Option<&OAuthToken> {
        self.token.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_complete(&self) -> bool {
        self.validation == Validation::Valid
    }

    /// Update the pasted code. Ignored while a validation is in flight.
    pub fn set_code(&mut self, code: impl Into<String>) {
        if self.validation != Validation::Verifying {
            self.code = code.into();
        }
    }

    /// Handle the confirm (enter) event.
    pub fn confirm(&mut self) -> FlowAction {
        match (self.state, self.validation) {
            (FlowState::Url, _) => {
                self.state = FlowState::Code;
                FlowAction::OpenBrowser(self.auth_url.clone())
            }
            (FlowState::Code, Validation::None | Validation::Error) => {
                self.validation = Validation::Verifying;
                self.last_error = None;
                FlowAction::Validate {
                    code: self.code.clone(),
                    verifier: self.pkce.verifier.clone(),
                }
            }
            (FlowState::Code, Validation::Valid) => match &self.token {
                Some(token) => FlowAction::Complete(token.clone()),
                None => FlowAction::Idle,
            },
            (FlowState::Code, Validation::Verifying) => FlowAction::Idle,
        }
    }

    /// Record the outcome of a [`FlowAction::Validate`].
    ///
    /// Any failure is a recoverable validation error: the flow stays in
    /// [`FlowState::Code`] and the next confirm retries.
    pub fn validation_completed(&mut self, result: Result<OAuthToken>) {
        if self.validation != Validation::Verifying {
            tracing::debug!("ignoring stale OAuth validation result");
            return;
        }

        match result {
            Ok(token) => {
                self.validation = Validation::Valid;
                self.token = Some(token);
            }
            Err(e) => {
                tracing::warn!(error = %e, "OAuth code validation failed");
                self.validation = Validation::Error;
                self.token = None;
                self.last_error = Some(e.to_string());
            }
        }
    }
}
