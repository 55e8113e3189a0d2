//! Correlation of redirect callbacks with in-flight authorization requests.

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use super::CallbackParams;

/// In-flight authorization requests keyed by their CSRF `state` value.
///
/// Each request owns a single-shot channel that resolves when a callback bearing
/// its state arrives. Callbacks for unknown states are dropped silently: they
/// may belong to another authenticator sharing the same deep-link entry point.
#[derive(Debug, Default)]
pub(crate) struct PendingAuthorizations {
    requests: DashMap<String, oneshot::Sender<CallbackParams>>,
}

impl PendingAuthorizations {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a request for `state` and return the receiving end of its channel.
    pub(crate) fn register(&self, state: &str) -> oneshot::Receiver<CallbackParams> {
        let (sender, receiver) = oneshot::channel();
        self.requests.insert(state.to_string(), sender);
        receiver
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.requests.len()
    }

    /// Route a callback to the request whose state it carries.
    ///
    /// Returns `true` if a pending request consumed the callback.
    pub(crate) fn resolve(&self, params: CallbackParams) -> bool {
        if self.requests.is_empty() {
            trace!("Ignoring callback: no authorization in flight");
            return false;
        }
        let Some(state) = params.state.as_deref() else {
            trace!("Ignoring callback without state");
            return false;
        };
        let Some((_, sender)) = self.requests.remove(state) else {
            trace!("Ignoring callback with unrecognized state");
            return false;
        };

        debug!("Received authorization callback");
        // A send error means the waiting `authorize()` was dropped in the meantime.
        sender.send(params).is_ok()
    }

    /// Forget the request for `state`, if still pending.
    pub(crate) fn discard(&self, state: &str) {
        self.requests.remove(state);
    }
}

/// Removes a pending request when its `authorize()` call finishes or is dropped.
pub(crate) struct PendingGuard<'a> {
    pending: &'a PendingAuthorizations,
    state: String,
}

impl<'a> PendingGuard<'a> {
    pub(crate) fn new(pending: &'a PendingAuthorizations, state: &str) -> Self {
        Self {
            pending,
            state: state.to_string(),
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.discard(&self.state);
    }
}
