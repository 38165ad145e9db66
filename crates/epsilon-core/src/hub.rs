//! Publication fan-out.
//!
//! The hub holds the latest [`Publication`] in a `watch` channel, which
//! gives async consumers change notification for free, and additionally
//! calls synchronous subscriber callbacks on every publish.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use epsilon_types::{Publication, Snapshot, SubscriptionId};
use tokio::sync::watch;
use tracing::trace;

/// Callback invoked with every new publication.
pub type SubscriberCallback = Arc<dyn Fn(&Publication) + Send + Sync>;

/// Single-writer, many-reader publication holder.
pub struct PublicationHub {
    sender: watch::Sender<Publication>,
    subscribers: Mutex<BTreeMap<SubscriptionId, SubscriberCallback>>,
}

impl PublicationHub {
    /// Create a hub holding `initial`.
    pub fn new(initial: Publication) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        Self {
            sender,
            subscribers: Mutex::new(BTreeMap::new()),
        }
    }

    /// The latest publication.
    pub fn current(&self) -> Publication {
        self.sender.borrow().clone()
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.sender.borrow().snapshot)
    }

    /// Replace the publication and notify everyone.
    ///
    /// Callbacks run on the calling task, outside any lock, in
    /// subscription order.
    pub fn publish(&self, publication: Publication) {
        let cycle = publication.snapshot.cycle;
        self.sender.send_replace(publication);
        let published = self.current();

        let callbacks: Vec<SubscriberCallback> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        trace!(subscribers = callbacks.len(), cycle, "publishing");
        for callback in callbacks {
            callback(&published);
        }
    }

    /// Register a callback.
    pub fn subscribe(&self, callback: SubscriberCallback) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, callback);
        id
    }

    /// Remove a callback. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    /// A receiver that sees every future publication.
    pub fn watch(&self) -> watch::Receiver<Publication> {
        self.sender.subscribe()
    }
}

impl std::fmt::Debug for PublicationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self
            .subscribers
            .lock()
            .map_or(0, |subscribers| subscribers.len());
        f.debug_struct("PublicationHub")
            .field("cycle", &self.sender.borrow().snapshot.cycle)
            .field("subscribers", &subscribers)
            .finish()
    }
}
