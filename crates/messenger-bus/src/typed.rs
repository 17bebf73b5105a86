//! # Typed Access
//!
//! `ActionDef`/`EventDef` wrappers over the name-based API. Payloads are
//! converted with serde at the edges; the grant checks are unchanged.

use crate::handler::{ActionHandler, EventHandler};
use crate::messenger::{ActionRegistration, Messenger};
use messenger_types::{ActionDef, EventDef, MessengerError};
use std::future::Future;

impl Messenger {
    /// Register a synchronous handler for `A`.
    pub fn register_action<A, F>(&self, handler: F) -> Result<ActionRegistration, MessengerError>
    where
        A: ActionDef,
        F: Fn(A::Params) -> anyhow::Result<A::Output> + Send + Sync + 'static,
    {
        self.register_action_handler(
            A::NAME,
            ActionHandler::sync(move |params| {
                let params: A::Params = serde_json::from_value(params)?;
                Ok(serde_json::to_value(handler(params)?)?)
            }),
        )
    }

    /// Register an asynchronous handler for `A`.
    pub fn register_async_action<A, F, Fut>(&self, handler: F) -> Result<ActionRegistration, MessengerError>
    where
        A: ActionDef,
        F: Fn(A::Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<A::Output>> + Send + 'static,
    {
        self.register_action_handler(
            A::NAME,
            ActionHandler::from_async(move |params| {
                let pending = serde_json::from_value::<A::Params>(params).map(&handler);
                async move {
                    let output = pending?.await?;
                    Ok::<_, anyhow::Error>(serde_json::to_value(output)?)
                }
            }),
        )
    }

    /// Call `A` with typed parameters.
    pub async fn call_action<A: ActionDef>(&self, params: A::Params) -> Result<A::Output, MessengerError> {
        let params = serde_json::to_value(params)?;
        let output = self.call(A::NAME, params).await?;
        Ok(serde_json::from_value(output)?)
    }

    /// Call `A` whose handler is synchronous.
    pub fn call_action_sync<A: ActionDef>(&self, params: A::Params) -> Result<A::Output, MessengerError> {
        let params = serde_json::to_value(params)?;
        let output = self.call_sync(A::NAME, params)?;
        Ok(serde_json::from_value(output)?)
    }

    /// Publish `E` with a typed payload.
    pub fn publish_event<E: EventDef>(&self, payload: &E::Payload) -> Result<usize, MessengerError> {
        self.publish(E::NAME, serde_json::to_value(payload)?)
    }

    /// Subscribe to `E` with a typed handler. Returns the handler needed to
    /// unsubscribe.
    pub fn subscribe_event<E, F>(&self, handler: F) -> Result<EventHandler, MessengerError>
    where
        E: EventDef,
        F: Fn(E::Payload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_fn(E::NAME, move |payload| {
            let payload: E::Payload = serde_json::from_value(payload.clone())?;
            handler(payload)
        })
    }
}
