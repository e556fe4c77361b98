//! In-process fan-out of system events.
//!
//! The platform glue publishes screen and keyguard signals here; a running
//! coordinator holds one subscription per signal and drops them on stop.

use crate::platform::SystemEvent;
use crossbeam_channel::Sender;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, trace};

/// Handle for removing a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug)]
struct Subscription {
    event: SystemEvent,
    sender: Sender<SystemEvent>,
}

#[derive(Debug, Default)]
struct BusInner {
    next_id: u64,
    subscriptions: HashMap<SubscriptionId, Subscription>,
}

/// Broadcast hub for [`SystemEvent`]s.
#[derive(Debug, Default)]
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver every future `event` to `sender`.
    pub fn subscribe(&self, event: SystemEvent, sender: Sender<SystemEvent>) -> SubscriptionId {
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscriptions.insert(id, Subscription { event, sender });
        debug!(?event, "Subscribed to system event");
        id
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.lock().subscriptions.remove(&id).is_some()
    }

    /// Publish an event; returns how many subscribers received it.
    ///
    /// Subscribers whose receiving side is gone are pruned.
    pub fn publish(&self, event: SystemEvent) -> usize {
        let mut inner = self.lock();
        let mut delivered = 0;
        inner.subscriptions.retain(|_, sub| {
            if sub.event != event {
                return true;
            }
            match sub.sender.send(event) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        trace!(?event, delivered, "Published system event");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscriptions.len()
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_publish_reaches_matching_subscribers_only() {
        let bus = EventBus::new();
        let (tx, rx) = unbounded();
        bus.subscribe(SystemEvent::ScreenOn, tx.clone());
        bus.subscribe(SystemEvent::ScreenOff, tx);

        assert_eq!(bus.publish(SystemEvent::ScreenOn), 1);
        assert_eq!(bus.publish(SystemEvent::UserPresent), 0);
        assert_eq!(rx.try_recv().unwrap(), SystemEvent::ScreenOn);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let (tx, rx) = unbounded();
        let id = bus.subscribe(SystemEvent::ScreenOff, tx);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.publish(SystemEvent::ScreenOff), 0);
        assert!(rx.try_recv().is_err());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_dead_subscribers_are_pruned() {
        let bus = EventBus::new();
        let (tx, rx) = unbounded();
        bus.subscribe(SystemEvent::ScreenOn, tx);
        drop(rx);

        assert_eq!(bus.publish(SystemEvent::ScreenOn), 0);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
