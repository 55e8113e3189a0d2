//! OAuth 2.0 authentication infrastructure.
//!
//! Provides the authorization code flow with PKCE and the implicit flow for
//! apps that receive the provider redirect through a deep link.

mod authenticator;
mod callback;
mod options;
mod pkce;
mod request;
mod state;

pub mod token;

pub use authenticator::Authenticator;
pub use callback::CallbackParams;
pub use options::{
    AuthenticationType, AuthenticationTypeParseError, AuthenticatorOptions, DEFAULT_REDIRECT_URI,
};
pub use pkce::{PkceChallenge, PkceVerifier};
pub use request::AuthorizationRequest;
