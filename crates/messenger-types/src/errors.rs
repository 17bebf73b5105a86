//! # Error Types
//!
//! Defines the error taxonomy shared by every messenger.

use thiserror::Error;

/// Errors produced by the messenger bus.
///
/// `DuplicateAction` is fatal at boot. `UnregisteredAction` is recoverable by
/// the caller. `ActionNotAllowed` and `EventNotAllowed` are capability
/// violations and must never be swallowed.
#[derive(Debug, Error)]
pub enum MessengerError {
    /// A namespace, action or event name is malformed.
    #[error("Invalid name {name:?}: expected \"<Namespace>:<member>\"")]
    InvalidName { name: String },

    /// An action handler is already registered under this name.
    #[error("A handler for {action} has already been registered")]
    DuplicateAction { action: String },

    /// No handler is registered under this name.
    #[error("A handler for {action} has not been registered")]
    UnregisteredAction { action: String },

    /// The calling messenger's grant does not include this action.
    #[error("Action missing from allow list of {namespace}: {action}")]
    ActionNotAllowed { namespace: String, action: String },

    /// The calling messenger's grant does not include this event.
    #[error("Event missing from allow list of {namespace}: {event}")]
    EventNotAllowed { namespace: String, event: String },

    /// A messenger tried to register or publish outside its own namespace.
    #[error("Only allowed to register or publish within {namespace}, got {name}")]
    NamespaceMismatch { namespace: String, name: String },

    /// Delegation between views carved from different roots.
    #[error("Messenger {namespace} belongs to a different bus")]
    ForeignMessenger { namespace: String },

    /// `call_sync` reached a handler that only runs asynchronously.
    #[error("Handler for {action} is asynchronous and must be awaited")]
    AsyncHandler { action: String },

    /// The action handler itself failed. The original error is kept intact.
    #[error(transparent)]
    Handler(anyhow::Error),

    /// A typed payload did not match its definition.
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

impl MessengerError {
    /// Whether this error is a capability-boundary violation.
    pub fn is_capability_violation(&self) -> bool {
        matches!(
            self,
            Self::ActionNotAllowed { .. } | Self::EventNotAllowed { .. } | Self::NamespaceMismatch { .. }
        )
    }

    /// The handler's own error, if this is a handler failure.
    pub fn into_handler_error(self) -> Option<anyhow::Error> {
        match self {
            Self::Handler(err) => Some(err),
            _ => None,
        }
    }
}
