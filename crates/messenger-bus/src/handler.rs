//! # Handlers
//!
//! Callable shapes stored on the bus. Payloads are `serde_json::Value`;
//! typed definitions convert at the edges (see `typed.rs`).

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Result of an action handler.
pub type ActionResult = anyhow::Result<Value>;

/// Pending result of an asynchronous action handler.
pub type ActionFuture = BoxFuture<'static, ActionResult>;

/// A registered action handler.
///
/// Synchronous handlers run inline on the caller. Asynchronous handlers
/// return a future the caller awaits.
#[derive(Clone)]
pub enum ActionHandler {
    Sync(Arc<dyn Fn(Value) -> ActionResult + Send + Sync>),
    Async(Arc<dyn Fn(Value) -> ActionFuture + Send + Sync>),
}

impl ActionHandler {
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(Value) -> ActionResult + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(handler))
    }

    pub fn from_async<F, Fut>(handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        Self::Async(Arc::new(move |params| handler(params).boxed()))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl std::fmt::Debug for ActionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("ActionHandler::Sync"),
            Self::Async(_) => f.write_str("ActionHandler::Async"),
        }
    }
}

/// An event subscriber.
///
/// Identity is the `Arc` allocation: keep a clone to unsubscribe later.
pub type EventHandler = Arc<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

/// Wrap a closure as an `EventHandler`.
pub fn event_handler<F>(handler: F) -> EventHandler
where
    F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(handler)
}

/// Produces the current payload of an event for selector subscriptions.
pub type PayloadGetter = Arc<dyn Fn() -> Value + Send + Sync>;

/// Whether two handlers are the same allocation.
///
/// Compares data pointers only; vtable pointers for the same closure can
/// differ across codegen units.
pub(crate) fn same_handler(a: &EventHandler, b: &EventHandler) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}
