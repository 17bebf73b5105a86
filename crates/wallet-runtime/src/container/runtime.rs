//! # Wallet Runtime
//!
//! Hosts the controllers and owns the root messenger.
//!
//! ## Boot Phases
//!
//! ```text
//! Phase 1: root messenger, manifest checked against the controller set
//! Phase 2: each controller built around its runtime messenger (registers actions)
//! Phase 3: every granted action must have a registered owner
//! Phase 4: each controller's init runs on a fresh init messenger, then it is disposed
//! ```
//!
//! Nothing outside this module holds the root messenger; controllers only
//! ever see their restricted views.

use std::collections::HashSet;
use std::sync::Arc;

use messenger_bus::{Messenger, QualifiedName};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::container::config::RuntimeConfig;
use crate::controllers::{builtin_factories, Controller, ControllerFactory, ControllerStatus};
use crate::errors::RuntimeError;
use crate::wiring::{unresolved_actions, ControllerGrant, DelegationManifest, UnresolvedGrant};

/// A controller and the messenger it was built around.
pub struct HostedController {
    pub grant: ControllerGrant,
    pub controller: Arc<dyn Controller>,
    pub messenger: Messenger,
    pub status: ControllerStatus,
}

/// The booted wallet: root messenger plus hosted controllers.
pub struct WalletRuntime {
    root: Messenger,
    controllers: Vec<HostedController>,
    unresolved: Vec<UnresolvedGrant>,
}

impl WalletRuntime {
    /// Boot the built-in controllers with the configured manifest.
    pub async fn boot(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let manifest = match &config.wiring.manifest_path {
            Some(path) => {
                info!(path = %path.display(), "Loading delegation manifest");
                DelegationManifest::load(path)?
            }
            None => DelegationManifest::builtin()?,
        };
        Self::boot_with(manifest, builtin_factories(), config.wiring.strict).await
    }

    /// Boot an explicit controller set.
    ///
    /// # Errors
    ///
    /// - `DuplicateController` if two factories share a namespace
    /// - `UnknownController` (strict) for a manifest entry with no factory
    /// - `UnresolvedGrant` (strict) for a granted action with no owner
    /// - `Init` (strict) when a controller's `init` fails
    /// - `Messenger` for grants the root cannot express or failed
    ///   registrations
    #[instrument(name = "wallet_boot", skip_all, fields(strict = strict))]
    pub async fn boot_with(
        manifest: DelegationManifest,
        factories: Vec<(&'static str, ControllerFactory)>,
        strict: bool,
    ) -> Result<Self, RuntimeError> {
        manifest.validate()?;

        // =====================================================================
        // PHASE 1: Root and plan
        // =====================================================================
        info!(controllers = factories.len(), "Phase 1: Planning controller wiring");
        let root = Messenger::root();

        let mut planned = HashSet::new();
        for (namespace, _) in &factories {
            if !planned.insert(*namespace) {
                return Err(RuntimeError::DuplicateController {
                    namespace: (*namespace).to_string(),
                });
            }
        }
        for grant in &manifest.controllers {
            if !planned.contains(grant.namespace.as_str()) {
                if strict {
                    return Err(RuntimeError::UnknownController {
                        namespace: grant.namespace.clone(),
                    });
                }
                warn!(namespace = %grant.namespace, "Manifest entry has no controller, ignoring");
            }
        }

        // =====================================================================
        // PHASE 2: Construction and registration
        // =====================================================================
        info!("Phase 2: Constructing controllers");
        let mut controllers = Vec::with_capacity(factories.len());
        for (namespace, factory) in factories {
            let grant = manifest.entry(namespace).cloned().unwrap_or_else(|| {
                warn!(namespace, "No manifest entry, controller gets no foreign capabilities");
                ControllerGrant::new(namespace)
            });
            let messenger = Messenger::restricted(grant.runtime_config(), &root)?;
            let controller = factory(messenger.clone())?;
            info!(
                namespace,
                actions = grant.actions.len(),
                events = grant.events.len(),
                "  Controller registered"
            );
            controllers.push(HostedController {
                grant,
                controller,
                messenger,
                status: ControllerStatus::Registered,
            });
        }

        // =====================================================================
        // PHASE 3: Grant resolution
        // =====================================================================
        info!("Phase 3: Resolving granted actions");
        let unresolved = unresolved_actions(root.registry(), controllers.iter().map(|c| &c.grant))?;
        for gap in &unresolved {
            if strict {
                return Err(RuntimeError::UnresolvedGrant {
                    namespace: gap.namespace.clone(),
                    action: gap.action.clone(),
                });
            }
            warn!(
                namespace = %gap.namespace,
                action = %gap.action,
                init_only = gap.init_only,
                "Granted action has no registered owner"
            );
        }

        // =====================================================================
        // PHASE 4: Init
        // =====================================================================
        info!("Phase 4: Running controller init");
        for hosted in &mut controllers {
            let init = Messenger::restricted(hosted.grant.init_config(), &root)?;
            let result = hosted.controller.init(&init).await;
            init.dispose();
            drop(init);

            match result {
                Ok(()) => hosted.status = ControllerStatus::Ready,
                Err(source) if strict => {
                    return Err(RuntimeError::Init {
                        namespace: hosted.grant.namespace.clone(),
                        source,
                    });
                }
                Err(err) => {
                    error!(namespace = %hosted.grant.namespace, error = %err, "Controller init failed");
                    hosted.status = ControllerStatus::Failed;
                }
            }
        }

        info!(
            controllers = controllers.len(),
            actions = root.registry().action_count(),
            "All controllers wired"
        );

        Ok(Self {
            root,
            controllers,
            unresolved,
        })
    }

    /// The unrestricted messenger. Reserved for the host, e.g. UI bridges.
    pub fn root(&self) -> &Messenger {
        &self.root
    }

    pub fn controllers(&self) -> &[HostedController] {
        &self.controllers
    }

    fn hosted(&self, namespace: &str) -> Option<&HostedController> {
        self.controllers.iter().find(|c| c.grant.namespace == namespace)
    }

    pub fn messenger(&self, namespace: &str) -> Option<&Messenger> {
        self.hosted(namespace).map(|c| &c.messenger)
    }

    pub fn controller(&self, namespace: &str) -> Option<&Arc<dyn Controller>> {
        self.hosted(namespace).map(|c| &c.controller)
    }

    pub fn status(&self, namespace: &str) -> Option<ControllerStatus> {
        self.hosted(namespace).map(|c| c.status)
    }

    /// Grants left unresolved by a non-strict boot.
    pub fn unresolved(&self) -> &[UnresolvedGrant] {
        &self.unresolved
    }

    pub fn summary(&self) -> WiringSummary {
        let registry = self.root.registry();
        let controllers = self
            .controllers
            .iter()
            .map(|hosted| {
                let owned = hosted
                    .messenger
                    .namespace()
                    .map(|ns| registry.owned_actions(ns))
                    .unwrap_or_default();
                ControllerSummary {
                    namespace: hosted.grant.namespace.clone(),
                    status: hosted.status,
                    owned_actions: owned.iter().map(QualifiedName::to_string).collect(),
                    granted_actions: hosted.grant.actions.clone(),
                    granted_events: hosted.grant.events.clone(),
                }
            })
            .collect();

        WiringSummary {
            controllers,
            registered_actions: registry.action_count(),
            unresolved: self.unresolved.clone(),
        }
    }

    /// Drop every subscription on the bus.
    pub fn shutdown(&self) {
        for hosted in &self.controllers {
            hosted.messenger.dispose();
        }
        self.root.clear_subscriptions();
        info!("Wallet runtime shut down");
    }
}

/// Serializable view of the wiring, logged at startup.
#[derive(Debug, Clone, Serialize)]
pub struct WiringSummary {
    pub controllers: Vec<ControllerSummary>,
    pub registered_actions: usize,
    pub unresolved: Vec<UnresolvedGrant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ControllerSummary {
    pub namespace: String,
    pub status: ControllerStatus,
    pub owned_actions: Vec<String>,
    pub granted_actions: Vec<String>,
    pub granted_events: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::{network, token_list, TokenListController};
    use messenger_bus::{ActionDef, EventDef};

    async fn boot_default(strict: bool) -> Result<WalletRuntime, RuntimeError> {
        let manifest = DelegationManifest::builtin().unwrap();
        WalletRuntime::boot_with(manifest, builtin_factories(), strict).await
    }

    #[tokio::test]
    async fn test_default_boot_is_ready() {
        let runtime = boot_default(true).await.unwrap();

        for (namespace, _) in builtin_factories() {
            assert_eq!(runtime.status(namespace), Some(ControllerStatus::Ready));
        }
        assert!(runtime.unresolved().is_empty());
    }

    #[tokio::test]
    async fn test_init_grant_not_kept_after_boot() {
        let runtime = boot_default(true).await.unwrap();
        let messenger = runtime.messenger(token_list::NAMESPACE).unwrap();

        assert!(!messenger.can_call(&QualifiedName::parse(network::GetState::NAME).unwrap()));
    }

    #[tokio::test]
    async fn test_summary_lists_owned_actions() {
        let runtime = boot_default(true).await.unwrap();
        let summary = runtime.summary();

        let network = summary
            .controllers
            .iter()
            .find(|c| c.namespace == network::NAMESPACE)
            .unwrap();
        assert_eq!(
            network.owned_actions,
            vec![
                "NetworkController:getState".to_string(),
                "NetworkController:setActiveNetwork".to_string(),
            ]
        );
        assert_eq!(summary.registered_actions, 5);
    }

    #[tokio::test]
    async fn test_duplicate_factory_rejected() {
        let factories = vec![
            (token_list::NAMESPACE, TokenListController::factory as ControllerFactory),
            (token_list::NAMESPACE, TokenListController::factory as ControllerFactory),
        ];

        let result = WalletRuntime::boot_with(DelegationManifest::default(), factories, false).await;
        assert!(matches!(result, Err(RuntimeError::DuplicateController { .. })));
    }

    #[tokio::test]
    async fn test_shutdown_drops_subscriptions() {
        let runtime = boot_default(true).await.unwrap();
        assert_eq!(
            runtime.root().subscriber_count(network::NetworkDidChange::NAME).unwrap(),
            1
        );

        runtime.shutdown();
        assert_eq!(
            runtime.root().subscriber_count(network::NetworkDidChange::NAME).unwrap(),
            0
        );
    }
}
