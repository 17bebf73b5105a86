//! # Runtime Errors
//!
//! Failures that stop the wallet from booting. Anything raised here is fatal:
//! the binary reports it and exits non-zero.

use std::path::PathBuf;

use messenger_types::MessengerError;
use thiserror::Error;

use crate::container::ConfigError;

/// Errors raised while loading configuration or wiring controllers.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read manifest {path}: {source}")]
    ManifestIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed manifest: {0}")]
    ManifestParse(#[from] serde_json::Error),

    /// The manifest or the controller set names a namespace twice.
    #[error("Controller {namespace} is declared more than once")]
    DuplicateController { namespace: String },

    /// Strict boot only: a manifest entry with no controller behind it.
    #[error("Manifest entry {namespace} has no matching controller")]
    UnknownController { namespace: String },

    /// A granted action has no registered owner after registration.
    #[error("{namespace} is granted {action}, but no controller registered it")]
    UnresolvedGrant { namespace: String, action: String },

    /// A controller's boot-time `init` failed.
    #[error("Controller {namespace} failed to initialize: {source}")]
    Init {
        namespace: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Messenger(#[from] MessengerError),
}
