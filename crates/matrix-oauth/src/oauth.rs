//! OAuth 2.0 PKCE flow for Claude subscription authentication.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use crate::error::{OAuthError, Result};
use crate::token::OAuthToken;

/// User agent sent to the token endpoint.
const USER_AGENT: &str = "matrix-cli";

/// OAuth client configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub authorize_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scope: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self::anthropic()
    }
}

impl OAuthConfig {
    /// Fixed endpoints and client registration for Claude subscriptions.
    pub fn anthropic() -> Self {
        Self {
            client_id: "9d1c250a-e61b-44d9-88ed-5944d1962f5e".to_string(),
            authorize_url: "https://claude.ai/oauth/authorize".to_string(),
            token_url: "https://console.anthropic.com/v1/oauth/token".to_string(),
            redirect_uri: "https://console.anthropic.com/oauth/code/callback".to_string(),
            scope: "org:create_api_key user:profile user:inference".to_string(),
        }
    }

    /// Point token requests at a different endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

/// PKCE code verifier and challenge pair.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub verifier: String,
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge pair from 32 random bytes.
    pub fn generate() -> Self {
        let mut verifier_bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        let challenge = URL_SAFE_NO_PAD.encode(hasher.finalize());

        Self {
            verifier,
            challenge,
        }
    }
}

/// Build the authorization URL for the OAuth flow.
///
/// The verifier doubles as the `state` parameter, so nothing besides the
/// challenge pair has to be kept between the two steps.
pub fn authorization_url(config: &OAuthConfig, pkce: &PkceChallenge) -> String {
    let params = [
        ("code", "true"),
        ("client_id", config.client_id.as_str()),
        ("response_type", "code"),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("scope", config.scope.as_str()),
        ("code_challenge", pkce.challenge.as_str()),
        ("code_challenge_method", "S256"),
        ("state", pkce.verifier.as_str()),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", config.authorize_url, query)
}

/// Split the pasted callback value into `(code, state)`.
///
/// The callback page shows `code#state`; a bare code yields an empty state.
pub fn parse_code(input: &str) -> Result<(String, String)> {
    let trimmed = input.trim();
    let (code, state) = match trimmed.split_once('#') {
        Some((code, state)) => (code, state),
        None => (trimmed, ""),
    };

    if code.is_empty() {
        return Err(OAuthError::InvalidRequest(
            "Missing authorization code".to_string(),
        ));
    }

    Ok((code.to_string(), state.to_string()))
}

#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    code: &'a str,
    state: &'a str,
    grant_type: &'static str,
    client_id: &'a str,
    redirect_uri: &'a str,
    code_verifier: &'a str,
}

#[derive(Debug, Serialize)]
struct TokenRefreshRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// Exchange a pasted authorization code for tokens.
pub async fn exchange_code(
    config: &OAuthConfig,
    input: &str,
    verifier: &str,
    cancel: &CancellationToken,
) -> Result<OAuthToken> {
    let (code, state) = parse_code(input)?;
    let body = TokenExchangeRequest {
        code: &code,
        state: &state,
        grant_type: "authorization_code",
        client_id: &config.client_id,
        redirect_uri: &config.redirect_uri,
        code_verifier: verifier,
    };

    tracing::debug!(token_url = %config.token_url, "exchanging authorization code");
    post_token(config, &body, "Token exchange", cancel).await
}

/// Obtain a new access token from a refresh token.
pub async fn refresh_token(
    config: &OAuthConfig,
    refresh_token: &str,
    cancel: &CancellationToken,
) -> Result<OAuthToken> {
    let body = TokenRefreshRequest {
        grant_type: "refresh_token",
        client_id: &config.client_id,
        refresh_token,
    };

    tracing::debug!(token_url = %config.token_url, "refreshing access token");
    post_token(config, &body, "Token refresh", cancel).await
}

async fn post_token<B: Serialize>(
    config: &OAuthConfig,
    body: &B,
    action: &str,
    cancel: &CancellationToken,
) -> Result<OAuthToken> {
    let request = async {
        let response = reqwest::Client::new()
            .post(&config.token_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(body)
            .send()
            .await
            .map_err(|e| OAuthError::Network(format!("{} request failed: {}", action, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OAuthError::Backend(format!(
                "{} failed ({}): {}",
                action, status, error_text
            )));
        }

        let text = response.text().await?;
        let parsed: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| OAuthError::InvalidResponse(format!("{}: {}", action, e)))?;

        if parsed.access_token.is_empty() {
            return Err(OAuthError::InvalidResponse(format!(
                "{}: empty access token",
                action
            )));
        }

        Ok(OAuthToken::new(
            parsed.access_token,
            parsed.refresh_token,
            parsed.expires_in,
        ))
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(OAuthError::Cancelled),
        result = request => result,
    }
}
