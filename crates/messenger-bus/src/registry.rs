//! # Namespace Registry
//!
//! Authoritative record of which namespace owns which action and which
//! events it emits. Action names are globally unique; a second registration
//! under the same name fails.

use crate::handler::ActionHandler;
use messenger_types::{MessengerError, Namespace, QualifiedName};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// A registered action.
#[derive(Debug, Clone)]
pub struct ActionEntry {
    pub owner: Namespace,
    pub handler: ActionHandler,
}

/// Ownership tables for actions and events.
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    actions: RwLock<HashMap<QualifiedName, ActionEntry>>,
    emitters: RwLock<HashMap<QualifiedName, Namespace>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` as the owner of `name`.
    ///
    /// # Errors
    ///
    /// - `NamespaceMismatch` if `name` is not addressed inside `namespace`
    /// - `DuplicateAction` if `name` is already registered
    pub fn register_action(
        &self,
        name: QualifiedName,
        namespace: &Namespace,
        handler: ActionHandler,
    ) -> Result<(), MessengerError> {
        if !namespace.owns(&name) {
            return Err(MessengerError::NamespaceMismatch {
                namespace: namespace.to_string(),
                name: name.to_string(),
            });
        }

        let mut actions = self.actions.write();
        if actions.contains_key(&name) {
            return Err(MessengerError::DuplicateAction {
                action: name.to_string(),
            });
        }

        debug!(action = %name, namespace = %namespace, async_handler = handler.is_async(), "Action registered");
        actions.insert(
            name,
            ActionEntry {
                owner: namespace.clone(),
                handler,
            },
        );
        Ok(())
    }

    /// Remove an action. Returns whether it was registered.
    pub fn unregister_action(&self, name: &QualifiedName) -> bool {
        let removed = self.actions.write().remove(name).is_some();
        if removed {
            debug!(action = %name, "Action unregistered");
        }
        removed
    }

    /// Declare `namespace` as the publisher of `name`.
    ///
    /// A second, different publisher is a contract violation. It is logged,
    /// not prevented; the first declaration stays authoritative.
    ///
    /// `Messenger` always declares the namespace parsed from `name`, so the
    /// conflict only arises for direct registry callers.
    pub fn register_event_emitter(&self, name: &QualifiedName, namespace: &Namespace) {
        if self.emitters.read().get(name) == Some(namespace) {
            return;
        }

        let mut emitters = self.emitters.write();
        match emitters.get(name) {
            Some(owner) if owner == namespace => {}
            Some(owner) => {
                warn!(
                    event = %name,
                    owner = %owner,
                    publisher = %namespace,
                    "Event declared by a namespace that does not own it"
                );
            }
            None => {
                debug!(event = %name, namespace = %namespace, "Event emitter registered");
                emitters.insert(name.clone(), namespace.clone());
            }
        }
    }

    /// Handler for `name`, cloned out of the table.
    pub fn handler(&self, name: &QualifiedName) -> Option<ActionHandler> {
        self.actions.read().get(name).map(|entry| entry.handler.clone())
    }

    pub fn is_registered(&self, name: &QualifiedName) -> bool {
        self.actions.read().contains_key(name)
    }

    pub fn action_owner(&self, name: &QualifiedName) -> Option<Namespace> {
        self.actions.read().get(name).map(|entry| entry.owner.clone())
    }

    pub fn event_emitter(&self, name: &QualifiedName) -> Option<Namespace> {
        self.emitters.read().get(name).cloned()
    }

    /// Actions owned by `namespace`, sorted.
    pub fn owned_actions(&self, namespace: &Namespace) -> Vec<QualifiedName> {
        let mut owned: Vec<_> = self
            .actions
            .read()
            .iter()
            .filter(|(_, entry)| &entry.owner == namespace)
            .map(|(name, _)| name.clone())
            .collect();
        owned.sort();
        owned
    }

    /// Events declared by `namespace`, sorted.
    pub fn owned_events(&self, namespace: &Namespace) -> Vec<QualifiedName> {
        let mut owned: Vec<_> = self
            .emitters
            .read()
            .iter()
            .filter(|(_, owner)| *owner == namespace)
            .map(|(name, _)| name.clone())
            .collect();
        owned.sort();
        owned
    }

    /// Every namespace that owns at least one action or event.
    pub fn namespaces(&self) -> BTreeSet<Namespace> {
        let mut namespaces: BTreeSet<Namespace> = self
            .actions
            .read()
            .values()
            .map(|entry| entry.owner.clone())
            .collect();
        namespaces.extend(self.emitters.read().values().cloned());
        namespaces
    }

    pub fn action_count(&self) -> usize {
        self.actions.read().len()
    }
}
