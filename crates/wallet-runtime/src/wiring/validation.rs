//! # Wiring Validation
//!
//! Checks run after every controller has registered its actions and before
//! any `init` runs. A grant naming an action nobody registered is a wiring
//! bug: the first call through it would fail with `UnregisteredAction`.

use messenger_bus::NamespaceRegistry;
use messenger_types::{MessengerError, QualifiedName};
use serde::Serialize;
use tracing::debug;

use super::manifest::ControllerGrant;

/// A granted action with no registered handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedGrant {
    pub namespace: String,
    pub action: String,
    /// Granted to the init messenger rather than the runtime one.
    pub init_only: bool,
}

/// Granted actions, runtime and init, that have no owner in `registry`.
pub fn unresolved_actions<'a, I>(
    registry: &NamespaceRegistry,
    grants: I,
) -> Result<Vec<UnresolvedGrant>, MessengerError>
where
    I: IntoIterator<Item = &'a ControllerGrant>,
{
    let mut unresolved = Vec::new();
    for grant in grants {
        let runtime = grant.actions.iter().map(|a| (a, false));
        let init = grant.init_actions.iter().map(|a| (a, true));
        for (action, init_only) in runtime.chain(init) {
            let name = QualifiedName::parse(action.as_str())?;
            if !registry.is_registered(&name) {
                unresolved.push(UnresolvedGrant {
                    namespace: grant.namespace.clone(),
                    action: action.clone(),
                    init_only,
                });
            }
        }

        // Events are declared on first publish, so a missing emitter is only
        // worth a note.
        for event in grant.events.iter().chain(&grant.init_events) {
            let name = QualifiedName::parse(event.as_str())?;
            if registry.event_emitter(&name).is_none() {
                debug!(namespace = %grant.namespace, event = %name, "Granted event has no declared emitter yet");
            }
        }
    }
    Ok(unresolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use messenger_bus::{ActionHandler, Messenger};
    use serde_json::json;

    #[test]
    fn test_reports_runtime_and_init_gaps() {
        let root = Messenger::root();
        root.register_action_handler("A:getX", ActionHandler::sync(|_| Ok(json!(1))))
            .unwrap();

        let mut grant = ControllerGrant::new("B");
        grant.actions = vec!["A:getX".into(), "A:missing".into()];
        grant.init_actions = vec!["C:bootstrap".into()];

        let unresolved = unresolved_actions(root.registry(), [&grant]).unwrap();

        assert_eq!(
            unresolved,
            vec![
                UnresolvedGrant {
                    namespace: "B".into(),
                    action: "A:missing".into(),
                    init_only: false,
                },
                UnresolvedGrant {
                    namespace: "B".into(),
                    action: "C:bootstrap".into(),
                    init_only: true,
                },
            ]
        );
    }

    #[test]
    fn test_malformed_name_is_an_error() {
        let root = Messenger::root();
        let mut grant = ControllerGrant::new("B");
        grant.actions = vec!["noSeparator".into()];

        assert!(matches!(
            unresolved_actions(root.registry(), [&grant]),
            Err(MessengerError::InvalidName { .. })
        ));
    }
}
