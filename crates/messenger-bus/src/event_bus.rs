//! # Event Bus
//!
//! Synchronous fan-out of named events.
//!
//! ## Delivery Contract
//!
//! - Subscribers are notified in subscription order, on the publisher's
//!   thread, without yielding between them.
//! - The subscriber list is snapshotted when `publish` starts. Subscribers
//!   added during the fan-out miss that publish.
//! - A subscriber that fails (returns `Err` or panics) is reported to the
//!   `ErrorReporter`; later subscribers still receive the event.

use crate::handler::{same_handler, EventHandler, PayloadGetter};
use crate::reporter::ErrorReporter;
use messenger_types::{Namespace, QualifiedName};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Identifies the messenger that made a subscription.
pub type SubscriberId = u64;

struct SubscriberEntry {
    owner: SubscriberId,
    namespace: Option<Namespace>,
    handler: EventHandler,
}

/// Subscriber lists and initial payload getters, keyed by event name.
pub struct EventBus {
    subscribers: RwLock<HashMap<QualifiedName, Vec<SubscriberEntry>>>,
    initial_payloads: RwLock<HashMap<QualifiedName, PayloadGetter>>,
    reporter: Arc<dyn ErrorReporter>,

    /// Total publish calls.
    events_published: AtomicU64,
}

impl EventBus {
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            initial_payloads: RwLock::new(HashMap::new()),
            reporter,
            events_published: AtomicU64::new(0),
        }
    }

    /// Notify every current subscriber of `event`.
    ///
    /// # Returns
    ///
    /// The number of subscribers notified, failed deliveries included.
    pub fn publish(&self, event: &QualifiedName, payload: &Value) -> usize {
        let snapshot: Vec<EventHandler> = self
            .subscribers
            .read()
            .get(event)
            .map(|entries| entries.iter().map(|e| Arc::clone(&e.handler)).collect())
            .unwrap_or_default();

        self.events_published.fetch_add(1, Ordering::Relaxed);
        trace!(event = %event, subscribers = snapshot.len(), "Publishing event");

        for handler in &snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => self.reporter.report(event, &err),
                Err(panic) => {
                    let err = anyhow::anyhow!("subscriber panicked: {}", panic_message(&*panic));
                    self.reporter.report(event, &err);
                }
            }
        }

        snapshot.len()
    }

    /// Add `handler` to `event`. The same owner adding the same handler
    /// twice is a no-op; another owner gets its own entry.
    ///
    /// # Returns
    ///
    /// `true` if the handler was newly added.
    pub fn subscribe(
        &self,
        owner: SubscriberId,
        namespace: Option<&Namespace>,
        event: &QualifiedName,
        handler: EventHandler,
    ) -> bool {
        let mut subscribers = self.subscribers.write();
        let entries = subscribers.entry(event.clone()).or_default();

        if entries
            .iter()
            .any(|e| e.owner == owner && same_handler(&e.handler, &handler))
        {
            return false;
        }

        entries.push(SubscriberEntry {
            owner,
            namespace: namespace.cloned(),
            handler,
        });
        debug!(event = %event, subscriber = ?namespace.map(Namespace::as_str), "Subscribed");
        true
    }

    /// Subscribe to changes in a derived value of `event`.
    ///
    /// `handler(selected, previous)` only runs when `selector(payload)`
    /// differs from the previous selection. The previous selection is seeded
    /// from the initial payload getter when one is registered.
    ///
    /// # Returns
    ///
    /// The wrapping handler, needed to unsubscribe.
    pub fn subscribe_with_selector<S, F>(
        &self,
        owner: SubscriberId,
        namespace: Option<&Namespace>,
        event: &QualifiedName,
        selector: S,
        handler: F,
    ) -> EventHandler
    where
        S: Fn(&Value) -> Value + Send + Sync + 'static,
        F: Fn(&Value, Option<&Value>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let getter = self.initial_payloads.read().get(event).cloned();
        let last = Mutex::new(getter.map(|get| selector(&get())));

        let wrapped: EventHandler = Arc::new(move |payload: &Value| {
            let selected = selector(payload);
            let previous = {
                let mut last = last.lock();
                if last.as_ref() == Some(&selected) {
                    return Ok(());
                }
                last.replace(selected.clone())
            };
            handler(&selected, previous.as_ref())
        });

        self.subscribe(owner, namespace, event, Arc::clone(&wrapped));
        wrapped
    }

    /// Remove `handler` from `event` if `owner` added it.
    ///
    /// # Returns
    ///
    /// `true` if something was removed. Absent handlers are not an error.
    pub fn unsubscribe(&self, owner: SubscriberId, event: &QualifiedName, handler: &EventHandler) -> bool {
        let mut subscribers = self.subscribers.write();
        let Some(entries) = subscribers.get_mut(event) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|e| !(e.owner == owner && same_handler(&e.handler, handler)));
        let removed = entries.len() != before;

        if entries.is_empty() {
            subscribers.remove(event);
        }
        if removed {
            debug!(event = %event, "Unsubscribed");
        }
        removed
    }

    /// Remove every subscriber of `event`. Returns how many were removed.
    pub fn clear_event(&self, event: &QualifiedName) -> usize {
        self.subscribers
            .write()
            .remove(event)
            .map_or(0, |entries| entries.len())
    }

    /// Remove every subscription made by `owner`, optionally limited to
    /// `events`. Returns how many were removed.
    pub fn clear_owner(&self, owner: SubscriberId, events: Option<&[QualifiedName]>) -> usize {
        let mut subscribers = self.subscribers.write();
        let mut removed = 0;

        subscribers.retain(|event, entries| {
            if events.is_some_and(|only| !only.contains(event)) {
                return true;
            }
            let before = entries.len();
            entries.retain(|e| e.owner != owner);
            removed += before - entries.len();
            !entries.is_empty()
        });

        removed
    }

    /// Remove every subscription on the bus.
    pub fn clear_all(&self) {
        self.subscribers.write().clear();
    }

    /// Register the getter used to seed selector subscriptions.
    pub fn register_initial_payload(&self, event: &QualifiedName, getter: PayloadGetter) {
        self.initial_payloads.write().insert(event.clone(), getter);
    }

    pub fn subscriber_count(&self, event: &QualifiedName) -> usize {
        self.subscribers.read().get(event).map_or(0, Vec::len)
    }

    /// Namespaces subscribed to `event`, in subscription order.
    pub fn subscriber_namespaces(&self, event: &QualifiedName) -> Vec<Option<Namespace>> {
        self.subscribers
            .read()
            .get(event)
            .map(|entries| entries.iter().map(|e| e.namespace.clone()).collect())
            .unwrap_or_default()
    }

    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::event_handler;
    use crate::reporter::CollectingErrorReporter;
    use serde_json::json;

    fn name(s: &str) -> QualifiedName {
        QualifiedName::parse(s).unwrap()
    }

    fn bus() -> (Arc<CollectingErrorReporter>, EventBus) {
        let reporter = Arc::new(CollectingErrorReporter::new());
        let bus = EventBus::new(reporter.clone());
        (reporter, bus)
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> EventHandler {
        let log = Arc::clone(log);
        event_handler(move |_| {
            log.lock().push(tag);
            Ok(())
        })
    }

    #[test]
    fn test_publish_in_subscription_order() {
        let (_, bus) = bus();
        let log = Arc::new(Mutex::new(Vec::new()));
        let event = name("A:changed");

        for tag in ["first", "second", "third"] {
            bus.subscribe(1, None, &event, recorder(&log, tag));
        }

        assert_eq!(bus.publish(&event, &json!({ "v": 1 })), 3);
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
        assert_eq!(bus.events_published(), 1);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let (_, bus) = bus();
        assert_eq!(bus.publish(&name("A:changed"), &Value::Null), 0);
        assert_eq!(bus.events_published(), 1);
    }

    #[test]
    fn test_failing_subscribers_are_isolated() {
        let (reporter, bus) = bus();
        let log = Arc::new(Mutex::new(Vec::new()));
        let event = name("A:changed");

        bus.subscribe(1, None, &event, event_handler(|_| Err(anyhow::anyhow!("bad listener"))));
        bus.subscribe(1, None, &event, event_handler(|_| panic!("exploded")));
        bus.subscribe(1, None, &event, recorder(&log, "last"));

        assert_eq!(bus.publish(&event, &Value::Null), 3);
        assert_eq!(*log.lock(), vec!["last"]);

        let reported = reporter.reported();
        assert_eq!(reported.len(), 2);
        assert_eq!(reported[0].message, "bad listener");
        assert_eq!(reported[1].message, "subscriber panicked: exploded");
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let (_, bus) = bus();
        let log = Arc::new(Mutex::new(Vec::new()));
        let event = name("A:changed");
        let handler = recorder(&log, "once");

        assert!(bus.subscribe(1, None, &event, Arc::clone(&handler)));
        assert!(!bus.subscribe(1, None, &event, Arc::clone(&handler)));

        bus.publish(&event, &Value::Null);
        assert_eq!(*log.lock(), vec!["once"]);
    }

    #[test]
    fn test_shared_handler_kept_per_owner() {
        let (_, bus) = bus();
        let log = Arc::new(Mutex::new(Vec::new()));
        let event = name("A:changed");
        let handler = recorder(&log, "shared");

        assert!(bus.subscribe(1, None, &event, Arc::clone(&handler)));
        assert!(bus.subscribe(2, None, &event, Arc::clone(&handler)));
        assert_eq!(bus.subscriber_count(&event), 2);

        assert_eq!(bus.clear_owner(1, None), 1);
        bus.publish(&event, &Value::Null);
        assert_eq!(*log.lock(), vec!["shared"]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let (_, bus) = bus();
        let log = Arc::new(Mutex::new(Vec::new()));
        let event = name("A:changed");
        let gone = recorder(&log, "gone");
        let kept = recorder(&log, "kept");

        bus.subscribe(1, None, &event, Arc::clone(&gone));
        bus.subscribe(1, None, &event, Arc::clone(&kept));

        assert!(bus.unsubscribe(1, &event, &gone));
        assert!(!bus.unsubscribe(1, &event, &gone));
        assert!(!bus.unsubscribe(1, &name("A:other"), &gone));

        bus.publish(&event, &Value::Null);
        assert_eq!(*log.lock(), vec!["kept"]);
    }

    #[test]
    fn test_unsubscribe_only_removes_own_entries() {
        let (_, bus) = bus();
        let event = name("A:changed");
        let handler = event_handler(|_| Ok(()));

        bus.subscribe(1, None, &event, Arc::clone(&handler));
        assert!(!bus.unsubscribe(2, &event, &handler));
        assert_eq!(bus.subscriber_count(&event), 1);
    }

    #[test]
    fn test_subscriber_added_during_publish_misses_it() {
        let (_, bus) = bus();
        let bus = Arc::new(bus);
        let event = name("A:changed");
        let late_calls = Arc::new(AtomicU64::new(0));

        let late = {
            let late_calls = Arc::clone(&late_calls);
            event_handler(move |_| {
                late_calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };
        let adder = {
            let bus = Arc::clone(&bus);
            let event = event.clone();
            event_handler(move |_| {
                bus.subscribe(1, None, &event, Arc::clone(&late));
                Ok(())
            })
        };
        bus.subscribe(1, None, &event, adder);

        assert_eq!(bus.publish(&event, &Value::Null), 1);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);

        assert_eq!(bus.publish(&event, &Value::Null), 2);
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_selector_only_fires_on_change() {
        let (_, bus) = bus();
        let event = name("A:stateChange");
        bus.register_initial_payload(&event, Arc::new(|| json!({ "count": 0, "other": "x" })));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe_with_selector(
            1,
            None,
            &event,
            |payload| payload["count"].clone(),
            move |selected, previous| {
                sink.lock().push((selected.clone(), previous.cloned()));
                Ok(())
            },
        );

        bus.publish(&event, &json!({ "count": 0, "other": "y" }));
        bus.publish(&event, &json!({ "count": 1, "other": "y" }));
        bus.publish(&event, &json!({ "count": 1, "other": "z" }));

        assert_eq!(*seen.lock(), vec![(json!(1), Some(json!(0)))]);
    }

    #[test]
    fn test_clear_owner_and_event() {
        let (_, bus) = bus();
        let a = name("A:changed");
        let b = name("B:changed");

        bus.subscribe(1, None, &a, event_handler(|_| Ok(())));
        bus.subscribe(1, None, &b, event_handler(|_| Ok(())));
        bus.subscribe(2, None, &a, event_handler(|_| Ok(())));

        assert_eq!(bus.clear_owner(1, Some(std::slice::from_ref(&b))), 1);
        assert_eq!(bus.subscriber_count(&a), 2);
        assert_eq!(bus.clear_owner(1, None), 1);
        assert_eq!(bus.subscriber_count(&a), 1);
        assert_eq!(bus.clear_event(&a), 1);
        assert_eq!(bus.subscriber_count(&a), 0);
    }
}
