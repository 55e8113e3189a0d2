//! # lens-auth
//!
//! OAuth 2.0 client authentication for headset apps that receive the provider
//! redirect through an OS deep link:
//! - Authorization code flow with PKCE (RFC 7636) and the implicit flow
//! - CSRF `state` correlation of redirect callbacks across concurrent flows
//! - Token persistence keyed by client ID, with optional encryption at rest
//! - Transparent refresh of expired access tokens
//!
//! ## Architecture
//!
//! - `oauth::token` owns the `Token` value, the `Storage` seam and the `TokenManager`
//! - `oauth::Authenticator` drives the protocol on top of `deep_link::DeepLink`
//! - `http` builds the shared HTTP client used for token endpoints
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lens_auth::{
//!     deep_link::LinkRouter,
//!     oauth::{AuthenticationType, Authenticator, AuthenticatorOptions, token::MemoryStorage},
//! };
//!
//! let options = AuthenticatorOptions::new(
//!     "client-id",
//!     "https://provider.example/authorize",
//!     "https://provider.example/token",
//!     AuthenticationType::Code,
//! );
//! let auth = Authenticator::new(options, MemoryStorage::new(), router).await?;
//! let token = auth.authorize("read write").await?;
//! ```

pub mod deep_link;
pub mod error;
pub mod http;
pub mod oauth;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
