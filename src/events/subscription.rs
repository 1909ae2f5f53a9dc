use std::sync::Arc;
use streamvisor_common::{LifecycleEvent, SubscriptionId};
use tokio::sync::mpsc;

use super::EventBus;

/// One observer's registration on the bus and its bounded inbox.
///
/// Leaving the bus always happens in the same order: the registry entry is
/// removed first, then the inbox is closed. Dropping a subscription does the
/// same, so a subscription can never be written to after it is gone.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    inbox: mpsc::Receiver<LifecycleEvent>,
    bus: Arc<EventBus>,
    registered: bool,
}

impl Subscription {
    pub(super) fn new(
        id: SubscriptionId,
        inbox: mpsc::Receiver<LifecycleEvent>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            id,
            inbox,
            bus,
            registered: true,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether this subscription is still in the bus registry.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the subscription has left the bus and every
    /// event already queued has been taken.
    pub async fn recv(&mut self) -> Option<LifecycleEvent> {
        self.inbox.recv().await
    }

    /// Take the next queued event without waiting.
    pub fn try_recv(&mut self) -> Option<LifecycleEvent> {
        self.inbox.try_recv().ok()
    }

    /// Leave the bus. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if self.registered {
            self.bus.unsubscribe(self.id);
            self.registered = false;
        }
        self.inbox.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
