//! # Delegation Manifest
//!
//! The JSON delegation graph: which controller may reach which foreign
//! actions and events, at runtime and during boot.
//!
//! ```json
//! {
//!   "controllers": [
//!     {
//!       "namespace": "TokenListController",
//!       "actions": ["PreferencesController:getState"],
//!       "events": ["NetworkController:networkDidChange"],
//!       "init_actions": ["NetworkController:getState"],
//!       "init_events": []
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use messenger_bus::RestrictedMessengerConfig;
use serde::{Deserialize, Serialize};

use crate::errors::RuntimeError;

/// Manifest compiled into the binary, used when no file is configured.
const BUILTIN_MANIFEST: &str = include_str!("../../manifests/default.json");

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationManifest {
    pub controllers: Vec<ControllerGrant>,
}

/// One controller's grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerGrant {
    pub namespace: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub init_actions: Vec<String>,
    #[serde(default)]
    pub init_events: Vec<String>,
}

impl ControllerGrant {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Construction contract of the long-lived messenger.
    pub fn runtime_config(&self) -> RestrictedMessengerConfig {
        RestrictedMessengerConfig::new(self.namespace.as_str())
            .allowed_actions(self.actions.iter().cloned())
            .allowed_events(self.events.iter().cloned())
    }

    /// Construction contract of the boot-only messenger.
    pub fn init_config(&self) -> RestrictedMessengerConfig {
        RestrictedMessengerConfig::new(self.namespace.as_str())
            .allowed_actions(self.init_actions.iter().cloned())
            .allowed_events(self.init_events.iter().cloned())
    }
}

impl DelegationManifest {
    pub fn builtin() -> Result<Self, RuntimeError> {
        Self::from_json(BUILTIN_MANIFEST)
    }

    /// Parse and validate a manifest document.
    pub fn from_json(json: &str) -> Result<Self, RuntimeError> {
        let manifest: Self = serde_json::from_str(json)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read, parse and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self, RuntimeError> {
        let json = std::fs::read_to_string(path).map_err(|source| RuntimeError::ManifestIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Every namespace appears at most once.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        let mut seen = HashSet::new();
        for grant in &self.controllers {
            if !seen.insert(grant.namespace.as_str()) {
                return Err(RuntimeError::DuplicateController {
                    namespace: grant.namespace.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn entry(&self, namespace: &str) -> Option<&ControllerGrant> {
        self.controllers.iter().find(|grant| grant.namespace == namespace)
    }
}
