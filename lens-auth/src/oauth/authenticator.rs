//! OAuth 2.0 authorization lifecycle for a single client.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};
use url::Url;

use super::state::{PendingAuthorizations, PendingGuard};
use super::token::{
    read_token_response, RefreshRequest, Storage, Token, TokenManager, DEFAULT_EXPIRES_IN,
};
use super::{
    AuthenticationType, AuthenticatorOptions, AuthorizationRequest, CallbackParams, PkceVerifier,
};
use crate::deep_link::{DeepLink, Subscription};
use crate::error::{oauth_error, token_error, Error, OAuthErrorKind, TokenErrorKind};
use crate::http::HttpClientBuilder;

/// Drives the authorization code (PKCE) or implicit flow and owns the current token.
///
/// One deep-link listener is registered per authenticator and released when the
/// authenticator is dropped. Callbacks are matched to in-flight `authorize()` calls
/// by their `state`; callbacks with any other state are ignored so that several
/// authenticators can share one deep-link entry point.
pub struct Authenticator<S: Storage> {
    options: AuthenticatorOptions,
    basic_auth: Option<SecretString>,
    token_manager: TokenManager<S>,
    deep_link: Arc<dyn DeepLink>,
    pending: Arc<PendingAuthorizations>,
    token: RwLock<Option<Token>>,
    refresh_lock: Mutex<()>,
    _subscription: Subscription,
}

impl<S: Storage> Authenticator<S> {
    /// Create an authenticator with a default HTTP client.
    ///
    /// A token previously persisted for the client ID is restored if present.
    pub async fn new(
        options: AuthenticatorOptions,
        storage: S,
        deep_link: Arc<dyn DeepLink>,
    ) -> Result<Self, Error> {
        let http_client = HttpClientBuilder::new().build()?;
        Ok(Self::with_http_client(options, storage, deep_link, http_client).await)
    }

    /// Create an authenticator that sends token requests through `http_client`.
    pub async fn with_http_client(
        options: AuthenticatorOptions,
        storage: S,
        deep_link: Arc<dyn DeepLink>,
        http_client: reqwest::Client,
    ) -> Self {
        let token_manager = TokenManager::new(storage, http_client);

        // Restoration is best-effort: unreadable state is treated as signed out.
        let token = match token_manager.restore_token(&options.client_id).await {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to restore token for client {}: {}", options.client_id, e);
                None
            }
        };
        if token.is_some() {
            debug!("Restored persisted token for client {}", options.client_id);
        }

        let pending = Arc::new(PendingAuthorizations::new());
        let listener_pending = Arc::downgrade(&pending);
        let subscription = deep_link.subscribe(Arc::new(move |url: &Url| {
            if let Some(pending) = listener_pending.upgrade() {
                pending.resolve(CallbackParams::parse(url));
            }
        }));

        Self {
            basic_auth: options.basic_auth(),
            options,
            token_manager,
            deep_link,
            pending,
            token: RwLock::new(token),
            refresh_lock: Mutex::new(()),
            _subscription: subscription,
        }
    }

    pub fn options(&self) -> &AuthenticatorOptions {
        &self.options
    }

    /// The currently held token, if any. It may be expired.
    pub fn token(&self) -> Option<Token> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True when a token with an access token is held and has not expired.
    pub fn is_authorized(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(Token::is_valid)
    }

    /// True while at least one `authorize()` call is waiting for its redirect.
    pub fn is_awaiting_callback(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of `authorize()` calls waiting for their redirect.
    pub fn pending_authorizations(&self) -> usize {
        self.pending.len()
    }

    /// Run the configured authorization flow and return the resulting token.
    ///
    /// Opens the authorization URL through the deep-link service, waits for the
    /// redirect carrying this request's state, and for the code flow exchanges the
    /// code (with its PKCE verifier) for a token. The token is persisted before
    /// returning. Dropping the returned future abandons the request.
    pub async fn authorize(&self, scope: &str) -> Result<Token, Error> {
        if !self.deep_link.is_supported() {
            return Err(oauth_error(
                OAuthErrorKind::UnsupportedEnvironment,
                "Authorization requires a live deep-link round-trip, unavailable in this context",
            ));
        }

        let request = AuthorizationRequest::new(&self.options, scope);

        // Registered before opening so an immediate redirect cannot be missed.
        let receiver = self.pending.register(&request.state);
        let _guard = PendingGuard::new(&self.pending, &request.state);

        info!(
            "Starting {} authorization for client {}",
            self.options.authentication_type, self.options.client_id
        );
        self.deep_link.open(&request.url).await?;

        let params = self.wait_for_callback(receiver).await?;

        match self.options.authentication_type {
            AuthenticationType::Implicit => {
                if let Some(access_token) = params.access_token.as_deref() {
                    // The implicit redirect carries no usable expiry in this design.
                    let token = Token::new(access_token, None, Some(DEFAULT_EXPIRES_IN));
                    self.store(token.clone()).await?;
                    info!(
                        "Implicit authorization completed for client {}",
                        self.options.client_id
                    );
                    return Ok(token);
                }
            }
            AuthenticationType::Code => {
                if let Some(code) = params.code.as_deref() {
                    let verifier = request.code_verifier.as_ref().ok_or_else(|| {
                        oauth_error(
                            OAuthErrorKind::TokenExchangeFailed,
                            "Code flow request has no PKCE verifier",
                        )
                    })?;
                    let token = self
                        .exchange_code_for_token(code, verifier, &request.redirect_uri)
                        .await?;
                    self.store(token.clone()).await?;
                    info!(
                        "Code authorization completed for client {}",
                        self.options.client_id
                    );
                    return Ok(token);
                }
            }
        }

        Err(callback_failure(&params))
    }

    /// Return a usable access token, refreshing it first if it has expired.
    pub async fn access_token(&self) -> Result<SecretString, Error> {
        let token = self.current_token()?;
        if !token.is_expired() {
            return Ok(token.access_token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        let token = self.current_token()?;
        if !token.is_expired() {
            debug!("Token was refreshed by another request");
            return Ok(token.access_token);
        }

        debug!("Access token expired for client {}, refreshing", self.options.client_id);
        Ok(self.refresh_locked(&token).await?.access_token)
    }

    /// Exchange the held refresh token for a new token and persist it.
    pub async fn refresh_token(&self) -> Result<Token, Error> {
        let _guard = self.refresh_lock.lock().await;
        let token = self.current_token()?;
        self.refresh_locked(&token).await
    }

    /// Forget the held token and clear it from storage.
    pub async fn sign_out(&self) {
        self.token
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Err(e) = self.token_manager.clear_token(&self.options.client_id).await {
            warn!("Failed to clear stored token for client {}: {}", self.options.client_id, e);
        }
        info!("Signed out client {}", self.options.client_id);
    }

    fn current_token(&self) -> Result<Token, Error> {
        self.token().ok_or_else(|| {
            token_error(
                TokenErrorKind::NotFound,
                "No token available; authorize first",
            )
        })
    }

    async fn refresh_locked(&self, token: &Token) -> Result<Token, Error> {
        let refresh_token = token.refresh_token.as_ref().ok_or_else(|| {
            token_error(
                TokenErrorKind::NoRefreshToken,
                "Token has no refresh token; authorize again",
            )
        })?;

        let refreshed = self
            .token_manager
            .refresh_token(RefreshRequest {
                client_id: &self.options.client_id,
                refresh_token,
                token_uri: self.options.refresh_endpoint(),
                basic_auth: self.basic_auth.as_ref(),
            })
            .await?;

        self.store(refreshed.clone()).await?;
        Ok(refreshed)
    }

    async fn wait_for_callback(
        &self,
        receiver: oneshot::Receiver<CallbackParams>,
    ) -> Result<CallbackParams, Error> {
        let received = match self.options.callback_timeout {
            Some(timeout) => tokio::time::timeout(timeout, receiver).await.map_err(|_| {
                warn!("Timed out waiting for authorization callback");
                oauth_error(
                    OAuthErrorKind::TimedOut,
                    &format!("No authorization callback within {:?}", timeout),
                )
            })?,
            None => receiver.await,
        };

        received.map_err(|_| {
            oauth_error(
                OAuthErrorKind::Cancelled,
                "Authorization request was discarded before a callback arrived",
            )
        })
    }

    async fn exchange_code_for_token(
        &self,
        code: &str,
        verifier: &PkceVerifier,
        redirect_uri: &str,
    ) -> Result<Token, Error> {
        debug!("Exchanging authorization code for tokens");

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", verifier.as_str()),
            ("client_id", self.options.client_id.as_str()),
        ];

        let mut builder = self
            .token_manager
            .http_client()
            .post(&self.options.token_uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&form);
        if let Some(basic_auth) = &self.basic_auth {
            builder =
                builder.header(AUTHORIZATION, format!("Basic {}", basic_auth.expose_secret()));
        }

        let response = builder.send().await.map_err(|e| {
            warn!("Failed to exchange authorization code: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: crate::ErrorKind::OAuth(OAuthErrorKind::TokenExchangeFailed),
            }
        })?;

        read_token_response(response, OAuthErrorKind::TokenExchangeFailed)
            .await?
            .into_token(None)
    }

    /// Persist `token`, then make it the held token. A failed save keeps the previous one.
    async fn store(&self, token: Token) -> Result<(), Error> {
        self.token_manager
            .save(&self.options.client_id, &token)
            .await?;
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(())
    }
}

/// Error for a matched callback that did not carry the expected result.
fn callback_failure(params: &CallbackParams) -> Error {
    match &params.error {
        Some(error) => {
            let message = match &params.error_description {
                Some(description) => format!("Provider returned error {}: {}", error, description),
                None => format!("Provider returned error {}", error),
            };
            warn!("Authorization failed: {}", error);
            oauth_error(OAuthErrorKind::AuthorizationFailed, &message)
        }
        None => {
            info!("Authorization cancelled");
            oauth_error(OAuthErrorKind::Cancelled, "Authorization was cancelled")
        }
    }
}
