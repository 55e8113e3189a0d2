//! Authenticator configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Redirect URI used when none is configured: the platform's unsecured web deep link.
pub const DEFAULT_REDIRECT_URI: &str =
    "https://www.spectacles.com/deeplink/specslink/oauth2redirect/unsecure";

/// OAuth 2.0 grant used to obtain tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationType {
    /// Authorization code flow with PKCE.
    #[default]
    Code,
    /// Implicit flow: the access token arrives directly on the redirect.
    Implicit,
}

impl AuthenticationType {
    /// Get the identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthenticationType::Code => "code",
            AuthenticationType::Implicit => "implicit",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct AuthenticationTypeParseError;

impl fmt::Display for AuthenticationTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "authentication type must be `code` or `implicit`")
    }
}

impl std::error::Error for AuthenticationTypeParseError {}

impl FromStr for AuthenticationType {
    type Err = AuthenticationTypeParseError;
    fn from_str(value: &str) -> Result<AuthenticationType, Self::Err> {
        match value.to_lowercase().as_str() {
            "code" => Ok(AuthenticationType::Code),
            "implicit" => Ok(AuthenticationType::Implicit),
            _ => Err(AuthenticationTypeParseError),
        }
    }
}

impl fmt::Display for AuthenticationType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for one authenticator, fixed for its lifetime.
#[derive(Debug, Clone)]
pub struct AuthenticatorOptions {
    pub client_id: String,
    pub authorization_uri: String,
    pub token_uri: String,
    /// Refresh endpoint; the token URI is used when unset.
    pub refresh_uri: Option<String>,
    /// Secret for confidential clients, sent as HTTP Basic credentials.
    pub client_secret: Option<SecretString>,
    /// Redirect URI; [`DEFAULT_REDIRECT_URI`] when unset.
    pub redirect_uri: Option<String>,
    pub authentication_type: AuthenticationType,
    /// How long `authorize()` waits for the redirect. `None` waits indefinitely.
    pub callback_timeout: Option<Duration>,
}

impl AuthenticatorOptions {
    pub fn new(
        client_id: impl Into<String>,
        authorization_uri: impl Into<String>,
        token_uri: impl Into<String>,
        authentication_type: AuthenticationType,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            authorization_uri: authorization_uri.into(),
            token_uri: token_uri.into(),
            refresh_uri: None,
            client_secret: None,
            redirect_uri: None,
            authentication_type,
            callback_timeout: None,
        }
    }

    pub fn with_refresh_uri(mut self, refresh_uri: impl Into<String>) -> Self {
        self.refresh_uri = Some(refresh_uri.into());
        self
    }

    pub fn with_client_secret(mut self, client_secret: SecretString) -> Self {
        self.client_secret = Some(client_secret);
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = Some(timeout);
        self
    }

    /// The effective redirect URI.
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uri.as_deref().unwrap_or(DEFAULT_REDIRECT_URI)
    }

    /// The effective refresh endpoint.
    pub fn refresh_endpoint(&self) -> &str {
        self.refresh_uri.as_deref().unwrap_or(&self.token_uri)
    }

    /// `base64(client_id:client_secret)` when a client secret is configured.
    pub fn basic_auth(&self) -> Option<SecretString> {
        self.client_secret.as_ref().map(|secret| {
            let credentials = format!("{}:{}", self.client_id, secret.expose_secret());
            SecretString::from(BASE64.encode(credentials))
        })
    }
}
