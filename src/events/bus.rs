use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use streamvisor_common::{LifecycleEvent, SubscriptionId};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::Subscription;

/// Inbox size used by [`EventBus::default`].
pub const DEFAULT_INBOX_CAPACITY: usize = 10;

/// Outcome of one [`EventBus::broadcast`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    /// Observers whose inbox accepted the event.
    pub delivered: usize,
    /// Observers that missed the event because their inbox was full.
    pub dropped: usize,
}

/// Cumulative bus counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    pub subscribers: usize,
    pub broadcasts: u64,
    pub delivered: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    broadcasts: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

/// Registry of observer inboxes.
///
/// The registry lock is held only to insert, remove, or iterate entries.
/// Broadcasting takes the read lock and never awaits while holding it.
#[derive(Debug)]
pub struct EventBus {
    registry: RwLock<HashMap<SubscriptionId, mpsc::Sender<LifecycleEvent>>>,
    capacity: usize,
    counters: Counters,
}

impl EventBus {
    /// Create a bus whose observers each buffer up to `capacity` events.
    ///
    /// The minimum capacity is 1 (clamped).
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            counters: Counters::default(),
        }
    }

    /// Register a new observer with an empty inbox.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = SubscriptionId::new();

        let total = {
            let mut registry = self.registry.write();
            registry.insert(id, tx);
            registry.len()
        };
        tracing::info!(subscription = %id, "Observer subscribed. Total observers: {}", total);

        Subscription::new(id, rx, Arc::clone(self))
    }

    /// Remove an observer from the registry.
    ///
    /// Returns `false` if it was not registered. Once this returns, no
    /// broadcast can write into that observer's inbox.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let (removed, total) = {
            let mut registry = self.registry.write();
            let removed = registry.remove(&id).is_some();
            (removed, registry.len())
        };

        if removed {
            tracing::info!(subscription = %id, "Observer unsubscribed. Total observers: {}", total);
        }
        removed
    }

    /// Offer `event` to every registered observer without waiting.
    pub fn broadcast(&self, event: LifecycleEvent) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        {
            let registry = self.registry.read();
            for (id, inbox) in registry.iter() {
                match inbox.try_send(event) {
                    Ok(()) => report.delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        report.dropped += 1;
                        tracing::trace!(subscription = %id, "Inbox full, dropped {}", event);
                    }
                    Err(TrySendError::Closed(_)) => {
                        // Inbox closed by an owner that has not unsubscribed yet.
                        report.dropped += 1;
                        tracing::debug!(subscription = %id, "Inbox closed, dropped {}", event);
                    }
                }
            }
        }

        self.counters.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.counters
            .delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.counters
            .dropped
            .fetch_add(report.dropped as u64, Ordering::Relaxed);

        tracing::debug!(
            channel = event.channel_id,
            "Broadcast {} to {} observers ({} dropped)",
            event.kind,
            report.delivered,
            report.dropped
        );

        report
    }

    /// Number of registered observers.
    pub fn subscriber_count(&self) -> usize {
        self.registry.read().len()
    }

    /// Whether `id` is currently registered.
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.registry.read().contains_key(&id)
    }

    /// Per-observer inbox size.
    pub fn inbox_capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            subscribers: self.subscriber_count(),
            broadcasts: self.counters.broadcasts.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_INBOX_CAPACITY)
    }
}
