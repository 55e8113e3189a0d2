//! Deep-link service seam.
//!
//! The host platform opens authorization URLs in the system browser and routes
//! the provider's redirect back into the app as a callback URI. Every registered
//! listener sees every callback; listeners decide for themselves whether a
//! callback belongs to them.

mod router;

pub use router::LinkRouter;

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::error::Error;

/// Callback invoked with each incoming deep-link URI.
pub type Listener = Arc<dyn Fn(&Url) + Send + Sync>;

/// Trait for the platform deep-link opener/listener.
#[async_trait]
pub trait DeepLink: Send + Sync {
    /// Returns false when running without a live redirect round-trip (e.g. in an editor preview).
    fn is_supported(&self) -> bool;

    /// Ask the OS to open `url`.
    ///
    /// Resolves once the open request is accepted, not when the user finishes in the browser.
    async fn open(&self, url: &str) -> Result<(), Error>;

    /// Register a listener for incoming callback URIs.
    ///
    /// The listener stays registered until the returned handle is dropped.
    fn subscribe(&self, listener: Listener) -> Subscription;
}

/// Owned registration handle. Dropping it unregisters the listener.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Create a subscription that runs `release` when dropped.
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}
