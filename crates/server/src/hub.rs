// crates/server/src/hub.rs
//! Progress broadcast hub.
//!
//! Holds the set of connected `/ws/progress` subscribers and fans every
//! progress event out to all of them. One hub per service instance, shared
//! through `AppState`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use stemsplit_core::ProgressEvent;
use tokio::sync::mpsc;

/// Identifier of a subscriber; increases with registration order.
pub type SubscriberId = u64;

/// Default cap on concurrent subscribers.
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 64;

/// Error returned when the hub is full.
#[derive(Debug, thiserror::Error)]
#[error("progress subscriber limit exceeded ({max} max)")]
pub struct SubscriberLimitError {
    pub max: usize,
}

pub struct ProgressHub {
    next_id: AtomicU64,
    /// Ordered by id, so iteration follows registration order.
    subscribers: RwLock<BTreeMap<SubscriberId, mpsc::UnboundedSender<ProgressEvent>>>,
    max_subscribers: usize,
}

impl ProgressHub {
    pub fn new(max_subscribers: usize) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(BTreeMap::new()),
            max_subscribers,
        }
    }

    /// Register a subscriber. The handle receives every later broadcast and
    /// unregisters itself when dropped.
    pub fn connect(self: &Arc<Self>) -> Result<SubscriberHandle, SubscriberLimitError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.write();
        if subscribers.len() >= self.max_subscribers {
            return Err(SubscriberLimitError {
                max: self.max_subscribers,
            });
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        subscribers.insert(id, tx);
        crate::metrics::set_progress_subscribers(subscribers.len());
        drop(subscribers);

        tracing::debug!(subscriber_id = id, "progress subscriber connected");
        Ok(SubscriberHandle {
            id,
            rx,
            hub: Arc::clone(self),
        })
    }

    /// Remove a subscriber. Unknown or already removed ids are ignored.
    pub fn disconnect(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.write();
        let removed = subscribers.remove(&id).is_some();
        if removed {
            crate::metrics::set_progress_subscribers(subscribers.len());
            tracing::debug!(subscriber_id = id, "progress subscriber disconnected");
        }
        removed
    }

    /// Deliver `event` to every subscriber in registration order.
    ///
    /// A subscriber whose receiver is gone is skipped and left in place; its
    /// connection handler removes it. Returns the number of deliveries.
    pub fn broadcast(&self, event: ProgressEvent) -> usize {
        let subscribers = self.read();
        let mut delivered = 0;
        for (id, tx) in subscribers.iter() {
            match tx.send(event) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::debug!(subscriber_id = id, "skipping closed progress subscriber")
                }
            }
        }
        crate::metrics::record_progress_event();
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.read().len()
    }

    pub fn max_subscribers(&self) -> usize {
        self.max_subscribers
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<SubscriberId, mpsc::UnboundedSender<ProgressEvent>>> {
        self.subscribers.read().unwrap_or_else(|poisoned| {
            tracing::error!("progress hub lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<SubscriberId, mpsc::UnboundedSender<ProgressEvent>>> {
        self.subscribers.write().unwrap_or_else(|poisoned| {
            tracing::error!("progress hub lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SUBSCRIBERS)
    }
}

/// A registered subscriber's receiving side.
pub struct SubscriberHandle {
    id: SubscriberId,
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
    hub: Arc<ProgressHub>,
}

impl SubscriberHandle {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next broadcast event. Cancel-safe.
    pub async fn recv(&mut self) -> Option<ProgressEvent> {
        self.rx.recv().await
    }
}

impl Drop for SubscriberHandle {
    fn drop(&mut self) {
        self.hub.disconnect(self.id);
    }
}
