//! # Network Controller
//!
//! Tracks the active chain. Switching networks is asynchronous: the new
//! chain is probed before the state flips, then `networkDidChange` and
//! `stateChange` are published in that order.

use std::sync::Arc;

use async_trait::async_trait;
use messenger_bus::{ActionDef, EventDef, Messenger, MessengerError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{controller_gone, Controller};

pub const NAMESPACE: &str = "NetworkController";

/// Chain the wallet starts on.
pub const DEFAULT_CHAIN_ID: &str = "0x1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    Unknown,
    Available,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkState {
    pub chain_id: String,
    pub status: NetworkStatus,
}

impl Default for NetworkState {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            status: NetworkStatus::Available,
        }
    }
}

pub struct GetState;

impl ActionDef for GetState {
    const NAME: &'static str = "NetworkController:getState";
    type Params = ();
    type Output = NetworkState;
}

pub struct SetActiveNetwork;

impl ActionDef for SetActiveNetwork {
    const NAME: &'static str = "NetworkController:setActiveNetwork";
    type Params = String;
    type Output = NetworkState;
}

pub struct NetworkDidChange;

impl EventDef for NetworkDidChange {
    const NAME: &'static str = "NetworkController:networkDidChange";
    type Payload = NetworkState;
}

pub struct StateChange;

impl EventDef for StateChange {
    const NAME: &'static str = "NetworkController:stateChange";
    type Payload = NetworkState;
}

pub struct NetworkController {
    messenger: Messenger,
    state: Arc<RwLock<NetworkState>>,
}

impl NetworkController {
    pub fn new(messenger: Messenger) -> Result<Arc<Self>, MessengerError> {
        let state = Arc::new(RwLock::new(NetworkState::default()));

        let reader = Arc::clone(&state);
        messenger.register_action::<GetState, _>(move |()| Ok(reader.read().clone()))?;

        let writer = Arc::clone(&state);
        let publisher = messenger.downgrade();
        messenger.register_async_action::<SetActiveNetwork, _, _>(move |chain_id| {
            let writer = Arc::clone(&writer);
            let publisher = publisher.clone();
            async move {
                let chain_id = normalize_chain_id(&chain_id)?;
                probe(&chain_id).await;

                let snapshot = {
                    let mut state = writer.write();
                    if state.chain_id == chain_id {
                        debug!(chain_id = %chain_id, "Network unchanged");
                        return Ok(state.clone());
                    }
                    state.chain_id = chain_id;
                    state.status = NetworkStatus::Available;
                    state.clone()
                };

                let messenger = publisher.upgrade().ok_or_else(|| controller_gone(NAMESPACE))?;
                messenger.publish_event::<NetworkDidChange>(&snapshot)?;
                messenger.publish_event::<StateChange>(&snapshot)?;
                info!(chain_id = %snapshot.chain_id, "Active network changed");
                Ok::<_, anyhow::Error>(snapshot)
            }
        })?;

        let current = Arc::clone(&state);
        messenger.register_initial_event_payload(StateChange::NAME, move || {
            serde_json::to_value(&*current.read()).unwrap_or_default()
        })?;

        Ok(Arc::new(Self { messenger, state }))
    }

    pub fn factory(messenger: Messenger) -> Result<Arc<dyn Controller>, MessengerError> {
        let controller: Arc<dyn Controller> = Self::new(messenger)?;
        Ok(controller)
    }

    pub fn state(&self) -> NetworkState {
        self.state.read().clone()
    }

    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }
}

#[async_trait]
impl Controller for NetworkController {
    fn namespace(&self) -> &'static str {
        NAMESPACE
    }
}

/// Lowercase `0x`-prefixed hex, no leading zeros.
fn normalize_chain_id(raw: &str) -> anyhow::Result<String> {
    let digits = raw
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| anyhow::anyhow!("chain id {raw:?} must be 0x-prefixed hex"))?;
    let value = u64::from_str_radix(digits, 16)
        .map_err(|_| anyhow::anyhow!("chain id {raw:?} is not valid hex"))?;
    if value == 0 {
        anyhow::bail!("chain id must be non-zero");
    }
    Ok(format!("{value:#x}"))
}

/// Stand-in for the RPC round trip that confirms the chain is reachable.
async fn probe(chain_id: &str) {
    debug!(chain_id, "Probing network");
    tokio::task::yield_now().await;
}
