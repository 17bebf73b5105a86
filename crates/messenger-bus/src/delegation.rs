//! # Delegation
//!
//! Boot-time hand-out of capabilities to an already constructed messenger.
//! The delegating view must itself reach everything it hands out, so
//! delegation can narrow authority but never widen it.

use crate::messenger::{parse_names, Messenger};
use messenger_types::MessengerError;
use tracing::info;

/// Delegation contract: `{ messenger, actions, events }`.
#[derive(Debug, Clone)]
pub struct Delegation<'a> {
    pub messenger: &'a Messenger,
    pub actions: Vec<String>,
    pub events: Vec<String>,
}

impl<'a> Delegation<'a> {
    pub fn to(messenger: &'a Messenger) -> Self {
        Self {
            messenger,
            actions: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events.extend(events.into_iter().map(Into::into));
        self
    }
}

impl Messenger {
    /// Extend the target messenger's grant.
    ///
    /// # Errors
    ///
    /// - `ForeignMessenger` if the target lives on another bus
    /// - `ActionNotAllowed` / `EventNotAllowed` if this view cannot reach a
    ///   delegated capability itself
    ///
    /// # Returns
    ///
    /// How many entries were new to the target's grant.
    pub fn delegate(&self, delegation: Delegation<'_>) -> Result<usize, MessengerError> {
        let target = delegation.messenger;
        self.ensure_same_bus(target)?;

        let actions = parse_names(&delegation.actions)?;
        let events = parse_names(&delegation.events)?;
        for action in &actions {
            self.authorize_action(action)?;
        }
        for event in &events {
            self.authorize_event(event)?;
        }

        let added = target.extend_grant(actions, events);
        info!(from = self.label(), to = target.label(), added, "Capabilities delegated");
        Ok(added)
    }

    /// Remove entries from the target messenger's grant. The target's
    /// subscriptions to revoked events are dropped. Views carved from the
    /// target lose the capability with it, subscriptions included.
    ///
    /// # Errors
    ///
    /// As `delegate`.
    ///
    /// # Returns
    ///
    /// How many entries were removed from the target's grant.
    pub fn revoke(&self, delegation: Delegation<'_>) -> Result<usize, MessengerError> {
        let target = delegation.messenger;
        self.ensure_same_bus(target)?;

        let actions = parse_names(&delegation.actions)?;
        let events = parse_names(&delegation.events)?;
        for action in &actions {
            self.authorize_action(action)?;
        }
        for event in &events {
            self.authorize_event(event)?;
        }

        let removed = target.revoke_grant(&actions, &events);
        info!(from = self.label(), to = target.label(), removed, "Capabilities revoked");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ActionHandler;
    use crate::messenger::RestrictedMessengerConfig;
    use messenger_types::QualifiedName;
    use serde_json::{json, Value};

    fn setup() -> (Messenger, Messenger) {
        let root = Messenger::root();
        root.register_action_handler("A:getX", ActionHandler::sync(|_| Ok(json!(42))))
            .unwrap();
        let d = Messenger::restricted(RestrictedMessengerConfig::new("D"), &root).unwrap();
        (root, d)
    }

    #[tokio::test]
    async fn test_delegation_extends_grant() {
        let (root, d) = setup();

        assert!(matches!(
            d.call("A:getX", Value::Null).await,
            Err(MessengerError::ActionNotAllowed { .. })
        ));

        let added = root.delegate(Delegation::to(&d).actions(["A:getX"])).unwrap();
        assert_eq!(added, 1);
        assert_eq!(d.call("A:getX", Value::Null).await.unwrap(), json!(42));

        // Delegating again adds nothing.
        assert_eq!(root.delegate(Delegation::to(&d).actions(["A:getX"])).unwrap(), 0);
    }

    #[test]
    fn test_delegator_must_hold_capability() {
        let (root, d) = setup();
        let e = Messenger::restricted(RestrictedMessengerConfig::new("E"), &root).unwrap();

        let result = d.delegate(Delegation::to(&e).actions(["A:getX"]));
        assert!(matches!(result, Err(MessengerError::ActionNotAllowed { .. })));
        assert!(!e.grant().allows_action(&QualifiedName::parse("A:getX").unwrap()));
    }

    #[test]
    fn test_foreign_bus_rejected() {
        let (root, _) = setup();
        let other_root = Messenger::root();
        let stranger = Messenger::restricted(RestrictedMessengerConfig::new("S"), &other_root).unwrap();

        let result = root.delegate(Delegation::to(&stranger).actions(["A:getX"]));
        assert!(matches!(result, Err(MessengerError::ForeignMessenger { .. })));
    }

    #[test]
    fn test_revoke_drops_capability_and_subscriptions() {
        let (root, d) = setup();
        root.delegate(
            Delegation::to(&d)
                .actions(["A:getX"])
                .events(["A:changed"]),
        )
        .unwrap();
        d.subscribe_fn("A:changed", |_| Ok(())).unwrap();
        assert_eq!(root.subscriber_count("A:changed").unwrap(), 1);

        let removed = root
            .revoke(
                Delegation::to(&d)
                    .actions(["A:getX"])
                    .events(["A:changed"]),
            )
            .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(root.subscriber_count("A:changed").unwrap(), 0);
        assert!(matches!(
            d.call_sync("A:getX", Value::Null),
            Err(MessengerError::ActionNotAllowed { .. })
        ));
    }

    #[test]
    fn test_revoke_reaches_views_carved_from_target() {
        let (root, d) = setup();
        root.delegate(
            Delegation::to(&d)
                .actions(["A:getX"])
                .events(["A:changed"]),
        )
        .unwrap();
        let e = Messenger::restricted(
            RestrictedMessengerConfig::new("E")
                .allowed_actions(["A:getX"])
                .allowed_events(["A:changed"]),
            &d,
        )
        .unwrap();
        e.subscribe_fn("A:changed", |_| Ok(())).unwrap();
        assert_eq!(e.call_sync("A:getX", Value::Null).unwrap(), json!(42));

        root.revoke(
            Delegation::to(&d)
                .actions(["A:getX"])
                .events(["A:changed"]),
        )
        .unwrap();

        assert!(matches!(
            e.call_sync("A:getX", Value::Null),
            Err(MessengerError::ActionNotAllowed { ref namespace, .. }) if namespace == "E"
        ));
        assert!(matches!(
            e.subscribe_fn("A:changed", |_| Ok(())),
            Err(MessengerError::EventNotAllowed { .. })
        ));
        assert_eq!(root.subscriber_count("A:changed").unwrap(), 0);

        // Granting the parent again restores the child's listed capability.
        root.delegate(Delegation::to(&d).actions(["A:getX"])).unwrap();
        assert_eq!(e.call_sync("A:getX", Value::Null).unwrap(), json!(42));
    }

    #[test]
    fn test_revoke_keeps_child_own_namespace() {
        let (root, d) = setup();
        root.delegate(Delegation::to(&d).events(["E:changed"])).unwrap();
        let e = Messenger::restricted(RestrictedMessengerConfig::new("E"), &d).unwrap();
        e.subscribe_fn("E:changed", |_| Ok(())).unwrap();

        root.revoke(Delegation::to(&d).events(["E:changed"])).unwrap();
        assert_eq!(root.subscriber_count("E:changed").unwrap(), 1);
    }
}
