//! Token endpoint response handling shared by code exchange and refresh.

use serde::Deserialize;
use tracing::warn;

use super::Token;
use crate::error::{oauth_error, Error, OAuthErrorKind};

/// Longest token lifetime accepted from a server, in seconds (ten years).
const MAX_EXPIRES_IN: i64 = 10 * 365 * 24 * 60 * 60;

/// Raw JSON body of a successful token endpoint response.
///
/// Every field is optional at the serde level so that validation can report
/// exactly which required field is missing.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl TokenResponse {
    /// Validate the response and build a token issued now.
    ///
    /// `fallback_refresh_token` is kept when the server does not rotate the refresh token.
    pub(crate) fn into_token(self, fallback_refresh_token: Option<String>) -> Result<Token, Error> {
        let access_token = self
            .access_token
            .filter(|at| !at.is_empty())
            .ok_or_else(|| {
                oauth_error(
                    OAuthErrorKind::InvalidResponse,
                    "Token response is missing access_token",
                )
            })?;
        let expires_in = self.expires_in.ok_or_else(|| {
            oauth_error(
                OAuthErrorKind::InvalidResponse,
                "Token response is missing expires_in",
            )
        })?;
        if !(0..=MAX_EXPIRES_IN).contains(&expires_in) {
            return Err(oauth_error(
                OAuthErrorKind::InvalidResponse,
                &format!("Token response has out-of-range expires_in {}", expires_in),
            ));
        }

        let refresh_token = self
            .refresh_token
            .filter(|rt| !rt.is_empty())
            .or(fallback_refresh_token);

        Ok(Token::new(access_token, refresh_token, Some(expires_in)))
    }
}

/// Read a token endpoint response, failing with `failure_kind` on a non-2xx status.
pub(crate) async fn read_token_response(
    response: reqwest::Response,
    failure_kind: OAuthErrorKind,
) -> Result<TokenResponse, Error> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if !status.is_success() {
        warn!("Token endpoint returned {}", status);
        return Err(oauth_error(
            failure_kind,
            &format!("Token endpoint returned {}: {}", status.as_u16(), body),
        ));
    }

    serde_json::from_str(&body).map_err(|e| {
        warn!("Failed to parse token endpoint response: {:?}", e);
        Error {
            source: Some(Box::new(e)),
            error_kind: crate::ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
        }
    })
}
