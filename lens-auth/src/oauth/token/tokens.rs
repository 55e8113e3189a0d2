//! OAuth token types.

use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Lifetime assumed when the server reports no `expires_in`, in seconds.
pub const DEFAULT_EXPIRES_IN: i64 = 3600;

/// Safety margin subtracted from the server-reported expiry, in milliseconds.
pub const EXPIRY_MARGIN_MS: i64 = 60_000;

/// Credential set issued by an authorization server.
///
/// Tokens are replaced wholesale on refresh or re-authorization, never mutated.
#[derive(Debug, Clone)]
pub struct Token {
    /// Access token for API requests.
    pub access_token: SecretString,
    /// Refresh token for obtaining new access tokens. Absent for the implicit flow.
    pub refresh_token: Option<SecretString>,
    /// Lifetime in seconds as reported by the server.
    pub expires_in: i64,
    /// Absolute expiry in epoch milliseconds, already reduced by [`EXPIRY_MARGIN_MS`].
    pub expiration_timestamp: i64,
}

impl Token {
    /// Create a token issued now.
    ///
    /// `expires_in` defaults to [`DEFAULT_EXPIRES_IN`] when the server did not report one.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
    ) -> Self {
        Self::issued_at(
            access_token,
            refresh_token,
            expires_in,
            Utc::now().timestamp_millis(),
        )
    }

    /// Create a token issued at `issued_at_ms` (epoch milliseconds).
    pub fn issued_at(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
        issued_at_ms: i64,
    ) -> Self {
        let expires_in = expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        let expiration_timestamp = issued_at_ms
            .saturating_add(expires_in.saturating_mul(1000))
            .saturating_sub(EXPIRY_MARGIN_MS);
        Self::with_expiration_timestamp(
            access_token,
            refresh_token,
            expires_in,
            expiration_timestamp,
        )
    }

    /// Create a token with an explicit expiry, as when restoring from storage.
    pub fn with_expiration_timestamp(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: i64,
        expiration_timestamp: i64,
    ) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: refresh_token.map(SecretString::from),
            expires_in,
            expiration_timestamp,
        }
    }

    /// Check whether the expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.expiration_timestamp < Utc::now().timestamp_millis()
    }

    /// True when the token carries an access token and has not expired.
    pub fn is_valid(&self) -> bool {
        !self.access_token.expose_secret().is_empty() && !self.is_expired()
    }

    /// True when the token can be refreshed without re-authorizing.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Expiry as a UTC datetime.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expiration_timestamp)
    }

    pub(crate) fn to_stored(&self) -> StoredToken {
        StoredToken {
            access_token: self.access_token.expose_secret().clone(),
            refresh_token: self
                .refresh_token
                .as_ref()
                .map(|rt| rt.expose_secret().clone()),
            expires_in: Some(self.expires_in),
            expiration_timestamp: Some(self.expiration_timestamp),
        }
    }

    pub(crate) fn from_stored(stored: StoredToken) -> Self {
        match stored.expiration_timestamp {
            Some(expiration_timestamp) => Self::with_expiration_timestamp(
                stored.access_token,
                stored.refresh_token,
                stored.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
                expiration_timestamp,
            ),
            None => Self::new(stored.access_token, stored.refresh_token, stored.expires_in),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(access_token: [REDACTED], refresh_token: {}, expires_in: {}, \
             expiration_timestamp: {})",
            if self.has_refresh_token() { "[REDACTED]" } else { "none" },
            self.expires_in,
            self.expiration_timestamp
        )
    }
}

/// Persisted JSON form of a [`Token`].
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct StoredToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expiration_timestamp: Option<i64>,
}
