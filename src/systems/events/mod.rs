use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use bevy::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

#[derive(Default)]
struct Channels {
    next_id: u64,
    handlers: HashMap<TypeId, Vec<(SubscriptionId, Handler)>>,
}

/// Typed publish/subscribe keyed by the event type. Clones share the same
/// channels. Dispatch runs over a snapshot of the subscriber list, so a
/// handler may subscribe or unsubscribe; the change applies to the next
/// publish.
#[derive(Clone, Default, Resource)]
pub struct EventBus {
    channels: Arc<Mutex<Channels>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.lock();
        f.debug_struct("EventBus")
            .field("channels", &channels.handlers.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<E: Any>(&self, handler: impl Fn(&E) + Send + Sync + 'static) -> SubscriptionId {
        let mut channels = self.lock();
        channels.next_id += 1;
        let id = SubscriptionId(channels.next_id);
        let erased: Handler = Arc::new(move |event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                handler(event);
            }
        });
        channels
            .handlers
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, erased));
        id
    }

    pub fn unsubscribe<E: Any>(&self, id: SubscriptionId) -> bool {
        let mut channels = self.lock();
        let Some(handlers) = channels.handlers.get_mut(&TypeId::of::<E>()) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        before != handlers.len()
    }

    /// Delivers `event` to every current subscriber of `E`; returns how
    /// many were called.
    pub fn publish<E: Any>(&self, event: &E) -> usize {
        let snapshot: Vec<Handler> = match self.lock().handlers.get(&TypeId::of::<E>()) {
            Some(handlers) => handlers.iter().map(|(_, handler)| Arc::clone(handler)).collect(),
            None => return 0,
        };
        for handler in &snapshot {
            handler(event);
        }
        snapshot.len()
    }

    pub fn subscriber_count<E: Any>(&self) -> usize {
        self.lock()
            .handlers
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, Channels> {
        // A panicking handler runs outside the lock, so poisoning only comes
        // from a panic inside the bookkeeping above.
        self.channels.lock().unwrap_or_else(|poisoned| {
            log::warn!("event bus lock was poisoned; continuing with its state");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, PartialEq)]
    struct Opened(&'static str);

    #[derive(Debug, PartialEq)]
    struct Closed;

    #[test]
    fn events_reach_only_their_own_channel() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe::<Opened>(move |event| sink.lock().expect("sink").push(event.0));

        assert_eq!(bus.publish(&Opened("pause")), 1);
        assert_eq!(bus.publish(&Closed), 0);
        assert_eq!(*seen.lock().expect("seen"), vec!["pause"]);
    }

    #[test]
    fn unsubscribe_removes_one_handler() {
        let bus = EventBus::new();
        let first = bus.subscribe::<Closed>(|_| {});
        bus.subscribe::<Closed>(|_| {});

        assert!(bus.unsubscribe::<Closed>(first));
        assert!(!bus.unsubscribe::<Closed>(first));
        assert!(!bus.unsubscribe::<Opened>(first));
        assert_eq!(bus.subscriber_count::<Closed>(), 1);
    }

    #[test]
    fn subscribing_during_dispatch_applies_to_next_publish() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let inner_bus = bus.clone();
        let inner_calls = Arc::clone(&calls);
        bus.subscribe::<Closed>(move |_| {
            let counter = Arc::clone(&inner_calls);
            inner_bus.subscribe::<Closed>(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });

        assert_eq!(bus.publish(&Closed), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(bus.publish(&Closed), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_may_unsubscribe_itself() {
        let bus = EventBus::new();
        let slot = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicUsize::new(0));

        let inner_bus = bus.clone();
        let inner_slot = Arc::clone(&slot);
        let inner_calls = Arc::clone(&calls);
        let id = bus.subscribe::<Closed>(move |_| {
            inner_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = inner_slot.lock().expect("slot").take() {
                inner_bus.unsubscribe::<Closed>(id);
            }
        });
        *slot.lock().expect("slot") = Some(id);

        bus.publish(&Closed);
        bus.publish(&Closed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count::<Closed>(), 0);
    }
}
