//! # Grants
//!
//! A grant is the allow-list carried by a restricted messenger: which actions
//! it may call and which events it may subscribe to. Anything not listed is
//! denied. The root messenger carries an unrestricted grant.

use crate::names::QualifiedName;
use serde::Serialize;
use std::collections::BTreeSet;

/// Allow-list of actions and events for one messenger.
///
/// Only serialized. Grants come from checked configs or delegation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Grant {
    /// Root grant: everything is reachable.
    unrestricted: bool,
    actions: BTreeSet<QualifiedName>,
    events: BTreeSet<QualifiedName>,
}

impl Grant {
    /// An empty grant. Nothing outside the owner's namespace is reachable.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The root grant.
    pub fn unrestricted() -> Self {
        Self {
            unrestricted: true,
            ..Self::default()
        }
    }

    pub fn new(
        actions: impl IntoIterator<Item = QualifiedName>,
        events: impl IntoIterator<Item = QualifiedName>,
    ) -> Self {
        Self {
            unrestricted: false,
            actions: actions.into_iter().collect(),
            events: events.into_iter().collect(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }

    pub fn allows_action(&self, action: &QualifiedName) -> bool {
        self.unrestricted || self.actions.contains(action)
    }

    pub fn allows_event(&self, event: &QualifiedName) -> bool {
        self.unrestricted || self.events.contains(event)
    }

    pub fn actions(&self) -> impl Iterator<Item = &QualifiedName> {
        self.actions.iter()
    }

    pub fn events(&self) -> impl Iterator<Item = &QualifiedName> {
        self.events.iter()
    }

    /// Add entries. Returns how many were new.
    pub fn extend(
        &mut self,
        actions: impl IntoIterator<Item = QualifiedName>,
        events: impl IntoIterator<Item = QualifiedName>,
    ) -> usize {
        let mut added = 0;
        for action in actions {
            added += usize::from(self.actions.insert(action));
        }
        for event in events {
            added += usize::from(self.events.insert(event));
        }
        added
    }

    /// Remove entries. Absent entries are ignored. Returns how many were
    /// removed.
    pub fn revoke<'a>(
        &mut self,
        actions: impl IntoIterator<Item = &'a QualifiedName>,
        events: impl IntoIterator<Item = &'a QualifiedName>,
    ) -> usize {
        let mut removed = 0;
        for action in actions {
            removed += usize::from(self.actions.remove(action));
        }
        for event in events {
            removed += usize::from(self.events.remove(event));
        }
        removed
    }
}
