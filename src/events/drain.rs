use async_trait::async_trait;
use streamvisor_common::LifecycleEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::Subscription;

/// The observer's transport went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("observer transport closed")]
pub struct SinkClosed;

/// Where a drained event is written: one observer's delivery transport.
#[async_trait]
pub trait EventSink: Send {
    async fn deliver(&mut self, event: LifecycleEvent) -> Result<(), SinkClosed>;
}

#[async_trait]
impl EventSink for mpsc::Sender<LifecycleEvent> {
    async fn deliver(&mut self, event: LifecycleEvent) -> Result<(), SinkClosed> {
        self.send(event).await.map_err(|_| SinkClosed)
    }
}

/// Why a drain loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainExit {
    /// The observer's connection was torn down.
    Cancelled,
    /// The subscription's inbox was closed.
    InboxClosed,
    /// Writing to the transport failed.
    TransportClosed,
}

/// Move events from `subscription` into `sink` until the observer goes away.
///
/// Whatever the reason for stopping, the subscription leaves the bus before
/// this returns.
pub async fn drain<S>(
    mut subscription: Subscription,
    sink: &mut S,
    cancel: CancellationToken,
) -> DrainExit
where
    S: EventSink + ?Sized,
{
    let exit = loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break DrainExit::Cancelled,
            event = subscription.recv() => event,
        };

        let Some(event) = event else {
            break DrainExit::InboxClosed;
        };

        let delivered = tokio::select! {
            biased;
            _ = cancel.cancelled() => break DrainExit::Cancelled,
            result = sink.deliver(event) => result,
        };

        if delivered.is_err() {
            break DrainExit::TransportClosed;
        }
        tracing::trace!(subscription = %subscription.id(), "Delivered {}", event);
    };

    subscription.unsubscribe();
    tracing::debug!(subscription = %subscription.id(), "Drain stopped: {:?}", exit);
    exit
}

/// Run [`drain`] on its own task.
pub fn spawn_drain<S>(
    subscription: Subscription,
    mut sink: S,
    cancel: CancellationToken,
) -> JoinHandle<DrainExit>
where
    S: EventSink + 'static,
{
    tokio::spawn(async move { drain(subscription, &mut sink, cancel).await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn forwards_events_in_order() {
        let bus = Arc::new(EventBus::default());
        let sub = bus.subscribe();
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = spawn_drain(sub, tx, cancel.clone());

        for channel in [2, 0, 1] {
            bus.broadcast(LifecycleEvent::closed(channel));
        }

        for expected in [2, 0, 1] {
            let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(event.channel_id, expected);
        }

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), DrainExit::Cancelled);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn cancellation_unsubscribes_while_idle() {
        let bus = Arc::new(EventBus::default());
        let sub = bus.subscribe();
        let id = sub.id();
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let handle = spawn_drain(sub, tx, cancel.clone());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(bus.is_subscribed(id));

        cancel.cancel();
        assert_eq!(handle.await.unwrap(), DrainExit::Cancelled);
        assert!(!bus.is_subscribed(id));
    }

    #[tokio::test]
    async fn closed_transport_unsubscribes() {
        let bus = Arc::new(EventBus::default());
        let sub = bus.subscribe();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = spawn_drain(sub, tx, CancellationToken::new());

        bus.broadcast(LifecycleEvent::closed(0));
        assert_eq!(handle.await.unwrap(), DrainExit::TransportClosed);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_stalled_transport() {
        let bus = Arc::new(EventBus::default());
        let sub = bus.subscribe();
        // Transport with room for one event that nobody reads.
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let handle = spawn_drain(sub, tx, cancel.clone());

        bus.broadcast(LifecycleEvent::closed(0));
        bus.broadcast(LifecycleEvent::closed(1));
        tokio::time::sleep(Duration::from_millis(10)).await;

        cancel.cancel();
        let exit = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit, DrainExit::Cancelled);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
