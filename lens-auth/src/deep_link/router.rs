//! In-process deep-link router.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use async_trait::async_trait;
use tracing::{debug, trace};
use url::Url;

use super::{DeepLink, Listener, Subscription};
use crate::error::{deep_link_error, DeepLinkErrorKind, Error};

type Opener = Box<dyn Fn(&str) -> Result<(), Error> + Send + Sync>;
type Listeners = Mutex<Vec<(u64, Listener)>>;

/// Deep-link service that fans incoming callback URIs out to every live listener.
///
/// Opening a URL is delegated to the opener closure supplied at construction; the
/// host calls [`LinkRouter::deliver`] whenever the OS hands a redirect back to the app.
pub struct LinkRouter {
    listeners: Arc<Listeners>,
    next_id: AtomicU64,
    opener: Opener,
    supported: bool,
}

impl LinkRouter {
    /// Create a router that opens URLs with `opener`.
    pub fn new(opener: impl Fn(&str) -> Result<(), Error> + Send + Sync + 'static) -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
            opener: Box::new(opener),
            supported: true,
        }
    }

    /// Create a router for contexts without a live redirect round-trip.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new(|_| {
                Err(deep_link_error(
                    DeepLinkErrorKind::OpenFailed,
                    "Deep links are not supported in this context",
                ))
            })
        }
    }

    /// Deliver an incoming callback URI to every registered listener.
    ///
    /// Returns the number of listeners notified.
    pub fn deliver(&self, uri: &str) -> Result<usize, Error> {
        let url = Url::parse(uri).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::ErrorKind::DeepLink(DeepLinkErrorKind::InvalidUri),
        })?;

        // Listeners run outside the lock so they may subscribe or unsubscribe freely.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        trace!("Delivering deep link to {} listener(s)", listeners.len());
        for listener in &listeners {
            listener(&url);
        }

        Ok(listeners.len())
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl DeepLink for LinkRouter {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn open(&self, url: &str) -> Result<(), Error> {
        debug!("Opening deep link");
        (self.opener)(url)
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));

        let listeners: Weak<Listeners> = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(registered, _)| *registered != id);
            }
        })
    }
}
