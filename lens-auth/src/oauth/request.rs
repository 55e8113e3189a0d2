//! Authorization request construction.

use uuid::Uuid;

use super::{AuthenticationType, AuthenticatorOptions, PkceChallenge, PkceVerifier};

/// One authorization attempt: the URL to open plus the values needed to finish it.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Authorization URL to open in the browser.
    pub url: String,
    /// CSRF state parameter, unique per attempt.
    pub state: String,
    /// PKCE verifier for the code exchange. `None` for the implicit flow.
    pub code_verifier: Option<PkceVerifier>,
    /// Redirect URI the provider sends the user back to.
    pub redirect_uri: String,
}

impl AuthorizationRequest {
    /// Build a fresh request for `scope` with a new state (and verifier for the code flow).
    pub fn new(options: &AuthenticatorOptions, scope: &str) -> Self {
        let state = Uuid::new_v4().to_string();
        let redirect_uri = options.redirect_uri().to_string();

        let (query, code_verifier) = match options.authentication_type {
            AuthenticationType::Code => {
                let verifier = PkceVerifier::generate();
                let challenge = verifier.challenge();
                let query = format!(
                    "client_id={}&\
                    redirect_uri={}&\
                    response_type=code&\
                    state={}&\
                    scope={}&\
                    code_challenge={}&\
                    code_challenge_method={}",
                    urlencoding::encode(&options.client_id),
                    urlencoding::encode(&redirect_uri),
                    urlencoding::encode(&state),
                    urlencoding::encode(scope),
                    challenge.as_str(),
                    PkceChallenge::METHOD,
                );
                (query, Some(verifier))
            }
            AuthenticationType::Implicit => {
                let query = format!(
                    "response_type=token&\
                    client_id={}&\
                    redirect_uri={}&\
                    scope={}&\
                    state={}&\
                    prompt=consent",
                    urlencoding::encode(&options.client_id),
                    urlencoding::encode(&redirect_uri),
                    urlencoding::encode(scope),
                    urlencoding::encode(&state),
                );
                (query, None)
            }
        };

        let separator = if options.authorization_uri.contains('?') {
            '&'
        } else {
            '?'
        };

        Self {
            url: format!("{}{}{}", options.authorization_uri, separator, query),
            state,
            code_verifier,
            redirect_uri,
        }
    }
}
