//! # Controllers
//!
//! Each controller owns one namespace on the bus. It is constructed with its
//! restricted runtime messenger, registers its actions and initial event
//! payloads there, and may do boot-time work through a separate init
//! messenger.
//!
//! ## Plug-and-Play
//!
//! The runtime only knows controllers through `ControllerFactory`. Which
//! factories run is decided by `builtin_factories()`; what each controller
//! may reach is decided by the delegation manifest.

pub mod network;
pub mod preferences;
pub mod token_list;

use std::sync::Arc;

use async_trait::async_trait;
use messenger_bus::Messenger;
use messenger_types::MessengerError;
use serde::Serialize;

pub use network::NetworkController;
pub use preferences::PreferencesController;
pub use token_list::TokenListController;

/// Controller lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerStatus {
    /// Constructed, actions registered.
    Registered,
    /// `init` completed.
    Ready,
    /// `init` failed.
    Failed,
}

/// A wallet controller hosted by the runtime.
#[async_trait]
pub trait Controller: Send + Sync {
    /// The namespace this controller owns.
    fn namespace(&self) -> &'static str;

    /// Boot-time work through the init messenger. The messenger is disposed
    /// as soon as this returns.
    async fn init(&self, _init: &Messenger) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Builds a controller around its runtime messenger.
pub type ControllerFactory = fn(Messenger) -> Result<Arc<dyn Controller>, MessengerError>;

/// Namespaces and factories of the controllers shipped with the runtime, in
/// construction order.
pub fn builtin_factories() -> Vec<(&'static str, ControllerFactory)> {
    vec![
        (preferences::NAMESPACE, PreferencesController::factory as ControllerFactory),
        (network::NAMESPACE, NetworkController::factory as ControllerFactory),
        (token_list::NAMESPACE, TokenListController::factory as ControllerFactory),
    ]
}

/// Error for a handler whose controller has been dropped.
pub(crate) fn controller_gone(namespace: &str) -> anyhow::Error {
    anyhow::anyhow!("{namespace} is no longer running")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_namespaces_are_unique() {
        let factories = builtin_factories();
        let unique: HashSet<_> = factories.iter().map(|(ns, _)| *ns).collect();
        assert_eq!(unique.len(), factories.len());
    }

    #[test]
    fn test_factory_namespace_matches_controller() {
        let root = Messenger::root();
        for (namespace, factory) in builtin_factories() {
            let messenger = Messenger::restricted(
                messenger_bus::RestrictedMessengerConfig::new(namespace),
                &root,
            )
            .unwrap();
            let controller = factory(messenger).unwrap();
            assert_eq!(controller.namespace(), namespace);
        }
    }
}
