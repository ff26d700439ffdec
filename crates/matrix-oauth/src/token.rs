//! OAuth token bookkeeping.
//!
//! Tokens are persisted inside the provider entry of the config file and read
//! back before every provider build to decide whether a refresh is due.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Fraction of the original lifetime kept as an early-refresh buffer.
const REFRESH_BUFFER_DIVISOR: u64 = 10;

/// Access/refresh token pair issued by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime in seconds as reported at issue time.
    pub expires_in: u64,
    /// Absolute expiry as unix seconds, computed locally on issue.
    #[serde(default)]
    pub expires_at: i64,
}

impl OAuthToken {
    /// Create a token issued now, stamping its absolute expiry.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in: u64,
    ) -> Self {
        let mut token = Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_in,
            expires_at: 0,
        };
        token.set_expires_at();
        token
    }

    /// Recompute `expires_at` as now + `expires_in`.
    pub fn set_expires_at(&mut self) {
        self.expires_at = Utc::now().timestamp().saturating_add(self.lifetime());
    }

    /// Whether the token should be refreshed before use.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    /// Expiry test against an explicit clock (unix seconds).
    ///
    /// A token counts as expired once its remaining lifetime drops to 10% or
    /// less of `expires_in`. A zero `expires_in` gives a zero buffer.
    pub fn is_expired_at(&self, now: i64) -> bool {
        let buffer = i64::try_from(self.expires_in / REFRESH_BUFFER_DIVISOR).unwrap_or(i64::MAX);
        now >= self.expires_at.saturating_sub(buffer)
    }

    /// Seconds left before `expires_at`, floored at zero.
    pub fn remaining_secs(&self) -> u64 {
        u64::try_from(self.expires_at.saturating_sub(Utc::now().timestamp())).unwrap_or(0)
    }

    /// `expires_in` as a signed offset, clamped to `i64::MAX`.
    fn lifetime(&self) -> i64 {
        i64::try_from(self.expires_in).unwrap_or(i64::MAX)
    }
}
