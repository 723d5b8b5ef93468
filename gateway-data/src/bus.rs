use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, warn};

/// Topic name. Conventionally `"<exchange>.<kind>"` (e.g. `"binance.order"`)
/// for per-venue order events, or bare kind names (`"trade"`, `"bookl1"`)
/// for market data (spec §4.B/§4.J/§4.L).
pub type Topic = String;

type Handler = Box<dyn Fn(&(dyn Any + Send + Sync)) + Send + Sync>;

/// Opaque token identifying a registered handler, returned by `subscribe`
/// so callers that need to unsubscribe later can do so without comparing
/// closures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Registration {
    id: HandlerId,
    handler: Handler,
}

/// Topic-indexed publish/subscribe bus (spec §4.B). Every runtime component
/// that reacts to an event — OMS, EMS submit queues, the strategy — does so
/// by subscribing here rather than holding direct references to publishers.
///
/// Not `Send`/`Sync` shared across OS threads: the single-threaded
/// cooperative model (spec §5) means exactly one task ever calls `publish`
/// or `subscribe`.
#[derive(Default)]
pub struct MessageBus {
    topics: HashMap<Topic, Vec<Registration>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("topics", &self.topics.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `topic`. Each call allocates a fresh
    /// [`HandlerId`] — idempotence (spec: "same handler not re-added") is
    /// the caller's responsibility to enforce by tracking the id it was
    /// given and not subscribing twice for logically the same handler.
    pub fn subscribe<T, F>(&mut self, topic: impl Into<Topic>, handler: F) -> HandlerId
    where
        T: 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let boxed: Handler = Box::new(move |msg: &(dyn Any + Send + Sync)| {
            if let Some(typed) = msg.downcast_ref::<T>() {
                handler(typed);
            }
        });
        self.topics.entry(topic.into()).or_default().push(Registration { id, handler: boxed });
        id
    }

    pub fn unsubscribe(&mut self, topic: &str, id: HandlerId) {
        if let Some(handlers) = self.topics.get_mut(topic) {
            handlers.retain(|reg| reg.id != id);
        }
    }

    /// Invokes every handler registered on `topic`, in registration order,
    /// synchronously. A handler that panics is caught and logged; it never
    /// unwinds into the publisher, and later handlers for the same publish
    /// still run (spec: "exceptions from handlers are logged, never
    /// re-raised into the publisher").
    pub fn publish<T>(&self, topic: &str, msg: T)
    where
        T: Send + Sync + 'static,
    {
        let Some(handlers) = self.topics.get(topic) else { return };
        for reg in handlers {
            let outcome = catch_unwind(AssertUnwindSafe(|| (reg.handler)(&msg)));
            if outcome.is_err() {
                error!(topic, handler = reg.id.0, "message bus handler panicked");
            }
        }
        if handlers.is_empty() {
            warn!(topic, "publish on topic with no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    #[test]
    fn handlers_invoked_in_registration_order() {
        let mut bus = MessageBus::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let o1 = order.clone();
        bus.subscribe::<u32, _>("topic", move |v| o1.lock().unwrap().push(*v * 10));
        let o2 = order.clone();
        bus.subscribe::<u32, _>("topic", move |v| o2.lock().unwrap().push(*v * 100));

        bus.publish("topic", 1u32);

        assert_eq!(*order.lock().unwrap(), vec![10, 100]);
    }

    #[test]
    fn panicking_handler_does_not_stop_others() {
        let mut bus = MessageBus::new();
        let hits = Arc::new(AtomicU32::new(0));

        bus.subscribe::<u32, _>("topic", |_| panic!("boom"));
        let h = hits.clone();
        bus.subscribe::<u32, _>("topic", move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish("topic", 1u32);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_removes_handler() {
        let mut bus = MessageBus::new();
        let hits = Arc::new(AtomicU32::new(0));
        let h = hits.clone();
        let id = bus.subscribe::<u32, _>("topic", move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        bus.unsubscribe("topic", id);
        bus.publish("topic", 1u32);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn mismatched_type_on_topic_is_ignored() {
        let mut bus = MessageBus::new();
        let hits = Arc::new(AtomicU32::new(0));
        let h = hits.clone();
        bus.subscribe::<u32, _>("topic", move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        bus.publish("topic", "not a u32".to_string());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
