//! # Action Dispatcher
//!
//! Resolves a registered handler by name and invokes it. Handler errors
//! reach the caller unchanged; nothing is swallowed here.

use crate::handler::ActionHandler;
use crate::registry::NamespaceRegistry;
use messenger_types::{MessengerError, QualifiedName};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Routes named calls to their handlers.
pub struct ActionDispatcher {
    registry: Arc<NamespaceRegistry>,

    /// Total calls dispatched to a handler.
    calls_dispatched: AtomicU64,
}

impl ActionDispatcher {
    pub fn new(registry: Arc<NamespaceRegistry>) -> Self {
        Self {
            registry,
            calls_dispatched: AtomicU64::new(0),
        }
    }

    /// Invoke `action`, awaiting asynchronous handlers.
    ///
    /// # Errors
    ///
    /// - `UnregisteredAction` if nothing owns `action`
    /// - `Handler` carrying the handler's own error
    pub async fn call(&self, action: &QualifiedName, params: Value) -> Result<Value, MessengerError> {
        match self.resolve(action)? {
            ActionHandler::Sync(handler) => handler(params).map_err(MessengerError::Handler),
            ActionHandler::Async(handler) => handler(params).await.map_err(MessengerError::Handler),
        }
    }

    /// Invoke a synchronous handler inline.
    ///
    /// # Errors
    ///
    /// As `call`, plus `AsyncHandler` when the handler must be awaited.
    pub fn call_sync(&self, action: &QualifiedName, params: Value) -> Result<Value, MessengerError> {
        match self.resolve(action)? {
            ActionHandler::Sync(handler) => handler(params).map_err(MessengerError::Handler),
            ActionHandler::Async(_) => Err(MessengerError::AsyncHandler {
                action: action.to_string(),
            }),
        }
    }

    pub fn calls_dispatched(&self) -> u64 {
        self.calls_dispatched.load(Ordering::Relaxed)
    }

    /// Clone the handler out so no lock is held while it runs.
    fn resolve(&self, action: &QualifiedName) -> Result<ActionHandler, MessengerError> {
        let handler = self
            .registry
            .handler(action)
            .ok_or_else(|| MessengerError::UnregisteredAction {
                action: action.to_string(),
            })?;

        self.calls_dispatched.fetch_add(1, Ordering::Relaxed);
        trace!(action = %action, "Dispatching action");
        Ok(handler)
    }
}
