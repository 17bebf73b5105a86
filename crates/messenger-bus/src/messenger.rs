//! # Messenger
//!
//! The only surface controllers touch. A `Messenger` is a view over a shared
//! bus: the root view reaches everything, a restricted view reaches its own
//! namespace plus whatever its grant lists.
//!
//! ## Lifecycle
//!
//! ```text
//! root() / restricted()  ──→  Constructed (grant fixed)  ──→  Active
//!                                    ↑        │
//!                         delegate() │        │ revoke()
//!                                    └────────┘
//! ```
//!
//! `dispose()` drops the view's subscriptions. Registered actions stay until
//! their `ActionRegistration` is disposed.

use crate::dispatcher::ActionDispatcher;
use crate::event_bus::{EventBus, SubscriberId};
use crate::handler::{event_handler, ActionHandler, EventHandler, PayloadGetter};
use crate::registry::NamespaceRegistry;
use crate::reporter::{ErrorReporter, TracingErrorReporter};
use messenger_types::{Grant, MessengerError, Namespace, QualifiedName};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};

/// Label used in logs and errors for the root view.
pub const ROOT_LABEL: &str = "<root>";

/// State shared by every view carved from one root.
pub(crate) struct BusCore {
    pub(crate) registry: Arc<NamespaceRegistry>,
    pub(crate) dispatcher: ActionDispatcher,
    pub(crate) events: EventBus,
    next_id: AtomicU64,
}

impl BusCore {
    fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        let registry = Arc::new(NamespaceRegistry::new());
        Self {
            dispatcher: ActionDispatcher::new(Arc::clone(&registry)),
            registry,
            events: EventBus::new(reporter),
            next_id: AtomicU64::new(0),
        }
    }

    fn next_id(&self) -> SubscriberId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Construction contract for a restricted messenger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictedMessengerConfig {
    pub namespace: String,
    #[serde(default)]
    pub allowed_actions: Vec<String>,
    #[serde(default)]
    pub allowed_events: Vec<String>,
}

impl RestrictedMessengerConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn allowed_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn allowed_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_events = events.into_iter().map(Into::into).collect();
        self
    }
}

struct MessengerInner {
    id: SubscriberId,
    /// `None` for the root view.
    namespace: Option<Namespace>,
    grant: RwLock<Grant>,
    /// The view this one was carved from. `None` for the root.
    parent: Option<Messenger>,
    /// Views carved from this one, for revocation.
    children: Mutex<Vec<Weak<MessengerInner>>>,
    bus: Arc<BusCore>,
}

/// A capability-scoped view over the bus. Cloning shares the view.
#[derive(Clone)]
pub struct Messenger {
    inner: Arc<MessengerInner>,
}

impl Messenger {
    /// Create a root messenger with a fresh bus, logging subscriber failures.
    pub fn root() -> Self {
        Self::root_with_reporter(Arc::new(TracingErrorReporter))
    }

    /// Create a root messenger that sends subscriber failures to `reporter`.
    pub fn root_with_reporter(reporter: Arc<dyn ErrorReporter>) -> Self {
        let bus = Arc::new(BusCore::new(reporter));
        Self {
            inner: Arc::new(MessengerInner {
                id: bus.next_id(),
                namespace: None,
                grant: RwLock::new(Grant::unrestricted()),
                parent: None,
                children: Mutex::new(Vec::new()),
                bus,
            }),
        }
    }

    /// Carve a restricted view out of `parent`.
    ///
    /// # Errors
    ///
    /// - `InvalidName` for a malformed namespace or capability name
    /// - `ActionNotAllowed` / `EventNotAllowed` if `parent` cannot reach a
    ///   requested capability itself
    pub fn restricted(config: RestrictedMessengerConfig, parent: &Messenger) -> Result<Self, MessengerError> {
        let namespace = Namespace::new(config.namespace)?;
        let actions = parse_names(&config.allowed_actions)?;
        let events = parse_names(&config.allowed_events)?;

        for action in &actions {
            parent.authorize_action(action)?;
        }
        for event in &events {
            parent.authorize_event(event)?;
        }

        let bus = Arc::clone(&parent.inner.bus);
        debug!(
            namespace = %namespace,
            parent = parent.label(),
            actions = actions.len(),
            events = events.len(),
            "Restricted messenger created"
        );

        let child = Self {
            inner: Arc::new(MessengerInner {
                id: bus.next_id(),
                namespace: Some(namespace),
                grant: RwLock::new(Grant::new(actions, events)),
                parent: Some(parent.clone()),
                children: Mutex::new(Vec::new()),
                bus,
            }),
        };

        let mut siblings = parent.inner.children.lock();
        siblings.retain(|c| c.strong_count() > 0);
        siblings.push(Arc::downgrade(&child.inner));
        drop(siblings);

        Ok(child)
    }

    pub fn namespace(&self) -> Option<&Namespace> {
        self.inner.namespace.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.inner.namespace.is_none()
    }

    /// A handle that does not keep this view alive. Handlers that publish
    /// through their own messenger hold one of these, since the bus owns the
    /// handler.
    pub fn downgrade(&self) -> WeakMessenger {
        WeakMessenger {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Namespace, or `"<root>"`.
    pub fn label(&self) -> &str {
        self.inner.namespace.as_ref().map_or(ROOT_LABEL, Namespace::as_str)
    }

    /// Snapshot of the current grant.
    pub fn grant(&self) -> Grant {
        self.inner.grant.read().clone()
    }

    /// Ownership tables of the underlying bus.
    pub fn registry(&self) -> &NamespaceRegistry {
        &self.inner.bus.registry
    }

    /// Whether both views share one bus.
    pub fn same_bus(&self, other: &Messenger) -> bool {
        Arc::ptr_eq(&self.inner.bus, &other.inner.bus)
    }

    /// Own namespace, or listed in this grant and reachable by every
    /// ancestor.
    pub fn can_call(&self, action: &QualifiedName) -> bool {
        self.owns(action)
            || (self.inner.grant.read().allows_action(action)
                && self.inner.parent.as_ref().map_or(true, |p| p.can_call(action)))
    }

    pub fn can_subscribe(&self, event: &QualifiedName) -> bool {
        self.owns(event)
            || (self.inner.grant.read().allows_event(event)
                && self.inner.parent.as_ref().map_or(true, |p| p.can_subscribe(event)))
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    /// Register the handler for one of this namespace's actions.
    ///
    /// # Errors
    ///
    /// - `NamespaceMismatch` outside the messenger's own namespace
    /// - `DuplicateAction` if the action already has a handler
    pub fn register_action_handler(
        &self,
        action: &str,
        handler: ActionHandler,
    ) -> Result<ActionRegistration, MessengerError> {
        let name = QualifiedName::parse(action)?;
        let owner = self.authorize_own(&name)?;
        self.inner
            .bus
            .registry
            .register_action(name.clone(), &owner, handler)?;

        Ok(ActionRegistration {
            bus: Arc::clone(&self.inner.bus),
            name,
        })
    }

    /// Remove one of this namespace's action handlers.
    ///
    /// # Returns
    ///
    /// `true` if a handler was removed.
    pub fn unregister_action_handler(&self, action: &str) -> Result<bool, MessengerError> {
        let name = QualifiedName::parse(action)?;
        self.authorize_own(&name)?;
        Ok(self.inner.bus.registry.unregister_action(&name))
    }

    /// Call an action, awaiting it if its handler is asynchronous.
    ///
    /// # Errors
    ///
    /// - `ActionNotAllowed` if the action is outside this view's grant
    /// - `UnregisteredAction` if nothing owns the action
    /// - `Handler` with the handler's own error
    pub async fn call(&self, action: &str, params: Value) -> Result<Value, MessengerError> {
        let name = QualifiedName::parse(action)?;
        self.authorize_action(&name)?;
        self.inner.bus.dispatcher.call(&name, params).await
    }

    /// Call an action whose handler is synchronous.
    ///
    /// # Errors
    ///
    /// As `call`, plus `AsyncHandler` for asynchronous handlers.
    pub fn call_sync(&self, action: &str, params: Value) -> Result<Value, MessengerError> {
        let name = QualifiedName::parse(action)?;
        self.authorize_action(&name)?;
        self.inner.bus.dispatcher.call_sync(&name, params)
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Publish one of this namespace's events.
    ///
    /// Subscriber failures are reported to the bus's `ErrorReporter` and
    /// never returned here.
    ///
    /// # Returns
    ///
    /// The number of subscribers notified.
    pub fn publish(&self, event: &str, payload: Value) -> Result<usize, MessengerError> {
        let name = QualifiedName::parse(event)?;
        let owner = self.authorize_own(&name)?;
        self.inner.bus.registry.register_event_emitter(&name, &owner);
        Ok(self.inner.bus.events.publish(&name, &payload))
    }

    /// Register the getter that yields the current payload of one of this
    /// namespace's events. Selector subscriptions are seeded from it.
    pub fn register_initial_event_payload<F>(&self, event: &str, getter: F) -> Result<(), MessengerError>
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        let name = QualifiedName::parse(event)?;
        let owner = self.authorize_own(&name)?;
        self.inner.bus.registry.register_event_emitter(&name, &owner);
        let getter: PayloadGetter = Arc::new(getter);
        self.inner.bus.events.register_initial_payload(&name, getter);
        Ok(())
    }

    /// Subscribe `handler` to `event`. Subscribing the same handler twice
    /// through this view is a no-op.
    ///
    /// # Errors
    ///
    /// `EventNotAllowed` if the event is outside this view's grant.
    pub fn subscribe(&self, event: &str, handler: EventHandler) -> Result<(), MessengerError> {
        let name = QualifiedName::parse(event)?;
        self.authorize_event(&name)?;
        self.inner
            .bus
            .events
            .subscribe(self.inner.id, self.namespace(), &name, handler);
        Ok(())
    }

    /// Subscribe a closure. Returns the handler needed to unsubscribe.
    pub fn subscribe_fn<F>(&self, event: &str, handler: F) -> Result<EventHandler, MessengerError>
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let handler = event_handler(handler);
        self.subscribe(event, Arc::clone(&handler))?;
        Ok(handler)
    }

    /// Subscribe to changes of `selector(payload)`.
    ///
    /// `handler(selected, previous)` only runs when the selection changes.
    /// Returns the handler needed to unsubscribe.
    pub fn subscribe_with_selector<S, F>(
        &self,
        event: &str,
        selector: S,
        handler: F,
    ) -> Result<EventHandler, MessengerError>
    where
        S: Fn(&Value) -> Value + Send + Sync + 'static,
        F: Fn(&Value, Option<&Value>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let name = QualifiedName::parse(event)?;
        self.authorize_event(&name)?;
        Ok(self.inner.bus.events.subscribe_with_selector(
            self.inner.id,
            self.namespace(),
            &name,
            selector,
            handler,
        ))
    }

    /// Remove a subscription this view made. Absent handlers are not an
    /// error.
    pub fn unsubscribe(&self, event: &str, handler: &EventHandler) -> Result<bool, MessengerError> {
        let name = QualifiedName::parse(event)?;
        Ok(self.inner.bus.events.unsubscribe(self.inner.id, &name, handler))
    }

    /// Remove every subscriber of one of this namespace's events.
    pub fn clear_event_subscriptions(&self, event: &str) -> Result<usize, MessengerError> {
        let name = QualifiedName::parse(event)?;
        self.authorize_own(&name)?;
        Ok(self.inner.bus.events.clear_event(&name))
    }

    /// Remove subscriptions: all of them on the root, this view's own on a
    /// restricted messenger.
    pub fn clear_subscriptions(&self) {
        if self.is_root() {
            self.inner.bus.events.clear_all();
        } else {
            self.dispose();
        }
    }

    /// Drop every subscription this view made. Returns how many.
    pub fn dispose(&self) -> usize {
        let removed = self.inner.bus.events.clear_owner(self.inner.id, None);
        debug!(messenger = self.label(), removed, "Messenger disposed");
        removed
    }

    pub fn subscriber_count(&self, event: &str) -> Result<usize, MessengerError> {
        let name = QualifiedName::parse(event)?;
        Ok(self.inner.bus.events.subscriber_count(&name))
    }

    pub fn events_published(&self) -> u64 {
        self.inner.bus.events.events_published()
    }

    pub fn calls_dispatched(&self) -> u64 {
        self.inner.bus.dispatcher.calls_dispatched()
    }

    // =========================================================================
    // AUTHORIZATION
    // =========================================================================

    fn owns(&self, name: &QualifiedName) -> bool {
        self.inner.namespace.as_ref().is_some_and(|ns| ns.owns(name))
    }

    pub(crate) fn authorize_action(&self, action: &QualifiedName) -> Result<(), MessengerError> {
        if self.can_call(action) {
            return Ok(());
        }
        error!(namespace = self.label(), action = %action, "Action not in allow list");
        Err(MessengerError::ActionNotAllowed {
            namespace: self.label().to_string(),
            action: action.to_string(),
        })
    }

    pub(crate) fn authorize_event(&self, event: &QualifiedName) -> Result<(), MessengerError> {
        if self.can_subscribe(event) {
            return Ok(());
        }
        error!(namespace = self.label(), event = %event, "Event not in allow list");
        Err(MessengerError::EventNotAllowed {
            namespace: self.label().to_string(),
            event: event.to_string(),
        })
    }

    /// Registering and publishing are limited to the view's own namespace.
    /// The root may act for any namespace.
    fn authorize_own(&self, name: &QualifiedName) -> Result<Namespace, MessengerError> {
        match &self.inner.namespace {
            None => Namespace::new(name.namespace()),
            Some(ns) if ns.owns(name) => Ok(ns.clone()),
            Some(ns) => Err(MessengerError::NamespaceMismatch {
                namespace: ns.to_string(),
                name: name.to_string(),
            }),
        }
    }

    pub(crate) fn ensure_same_bus(&self, other: &Messenger) -> Result<(), MessengerError> {
        if self.same_bus(other) {
            return Ok(());
        }
        Err(MessengerError::ForeignMessenger {
            namespace: other.label().to_string(),
        })
    }

    pub(crate) fn extend_grant(&self, actions: Vec<QualifiedName>, events: Vec<QualifiedName>) -> usize {
        self.inner.grant.write().extend(actions, events)
    }

    pub(crate) fn revoke_grant(&self, actions: &[QualifiedName], events: &[QualifiedName]) -> usize {
        let removed = self.inner.grant.write().revoke(actions, events);
        if !events.is_empty() {
            self.drop_unreachable_subscriptions(events);
        }
        removed
    }

    /// Drop subscriptions to `events` that this view, or any view carved
    /// from it, can no longer reach.
    fn drop_unreachable_subscriptions(&self, events: &[QualifiedName]) {
        let lost: Vec<QualifiedName> = events.iter().filter(|e| !self.can_subscribe(e)).cloned().collect();
        if !lost.is_empty() {
            let dropped = self.inner.bus.events.clear_owner(self.inner.id, Some(&lost));
            if dropped > 0 {
                info!(messenger = self.label(), dropped, "Subscriptions dropped by revocation");
            }
        }

        let children: Vec<Messenger> = self
            .inner
            .children
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .map(|inner| Messenger { inner })
            .collect();
        for child in children {
            child.drop_unreachable_subscriptions(events);
        }
    }
}

impl fmt::Debug for Messenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Messenger")
            .field("namespace", &self.label())
            .field("grant", &*self.inner.grant.read())
            .finish()
    }
}

/// Non-owning handle to a `Messenger`.
#[derive(Clone)]
pub struct WeakMessenger {
    inner: Weak<MessengerInner>,
}

impl WeakMessenger {
    pub fn upgrade(&self) -> Option<Messenger> {
        self.inner.upgrade().map(|inner| Messenger { inner })
    }
}

impl fmt::Debug for WeakMessenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakMessenger")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Handle returned by `register_action_handler`.
///
/// Dropping it keeps the action registered; call `dispose` to revoke.
pub struct ActionRegistration {
    bus: Arc<BusCore>,
    name: QualifiedName,
}

impl ActionRegistration {
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Unregister the action. Returns `false` if it was already gone.
    pub fn dispose(self) -> bool {
        self.bus.registry.unregister_action(&self.name)
    }
}

impl fmt::Debug for ActionRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistration").field("name", &self.name).finish()
    }
}

pub(crate) fn parse_names(names: &[String]) -> Result<Vec<QualifiedName>, MessengerError> {
    names.iter().map(|n| QualifiedName::parse(n.as_str())).collect()
}
