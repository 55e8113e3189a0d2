//! Error types for the `lens-auth` crate.
//!
//! A root Error struct holds an error kind enum plus an optional chained source.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for lens-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in lens-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    OAuth(OAuthErrorKind),
    Token(TokenErrorKind),
    Storage(StorageErrorKind),
    DeepLink(DeepLinkErrorKind),
    Http(HttpErrorKind),
}

/// Errors from the authorization protocol and token endpoints.
#[derive(Debug, PartialEq)]
pub enum OAuthErrorKind {
    /// The runtime has no live deep-link support (design-time/editor context).
    UnsupportedEnvironment,
    /// The provider redirected back with an `error` parameter.
    AuthorizationFailed,
    /// The redirect carried neither a result nor an error.
    Cancelled,
    /// No matching callback arrived within the configured timeout.
    TimedOut,
    TokenExchangeFailed,
    TokenRefreshFailed,
    InvalidResponse,
}

/// Errors from token lifecycle operations.
#[derive(Debug, PartialEq)]
pub enum TokenErrorKind {
    NotFound,
    NoRefreshToken,
}

/// Errors from token storage operations.
#[derive(Debug, PartialEq)]
pub enum StorageErrorKind {
    Serialization,
    EncryptionFailed,
    DecryptionFailed,
    Io,
}

/// Errors from the deep-link service.
#[derive(Debug, PartialEq)]
pub enum DeepLinkErrorKind {
    OpenFailed,
    InvalidUri,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::OAuth(kind) => write!(f, "OAuth error: {:?}", kind)?,
            ErrorKind::Token(kind) => write!(f, "Token error: {:?}", kind)?,
            ErrorKind::Storage(kind) => write!(f, "Storage error: {:?}", kind)?,
            ErrorKind::DeepLink(kind) => write!(f, "Deep link error: {:?}", kind)?,
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind)?,
        }
        if let Some(source) = &self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Storage(StorageErrorKind::Serialization),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Storage(StorageErrorKind::Io),
        }
    }
}

/// Helper function to create OAuth errors.
pub fn oauth_error(kind: OAuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::OAuth(kind),
    }
}

/// Helper function to create token errors.
pub fn token_error(kind: TokenErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Token(kind),
    }
}

/// Helper function to create storage errors.
pub fn storage_error(kind: StorageErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Storage(kind),
    }
}

/// Helper function to create deep-link errors.
pub fn deep_link_error(kind: DeepLinkErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::DeepLink(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_source_message() {
        let err = oauth_error(OAuthErrorKind::AuthorizationFailed, "access_denied");
        assert_eq!(err.to_string(), "OAuth error: AuthorizationFailed: access_denied");
    }

    #[test]
    fn test_display_without_source() {
        let err = Error {
            source: None,
            error_kind: ErrorKind::Token(TokenErrorKind::NotFound),
        };
        assert_eq!(err.to_string(), "Token error: NotFound");
    }

    #[test]
    fn test_serde_error_maps_to_serialization() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert_eq!(
            err.error_kind,
            ErrorKind::Storage(StorageErrorKind::Serialization)
        );
        assert!(err.source().is_some());
    }
}
