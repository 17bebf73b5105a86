//! # Token List Controller
//!
//! Keeps the token list keyed to the active chain. A pure consumer: it reads
//! the network once at boot through its init messenger, then follows
//! `NetworkController:networkDidChange` and reads preferences through its
//! runtime grant.

use std::sync::Arc;

use async_trait::async_trait;
use messenger_bus::{ActionDef, Messenger, MessengerError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{controller_gone, network, preferences, Controller};

pub const NAMESPACE: &str = "TokenListController";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenListState {
    /// `None` until `init` has read the active network.
    pub chain_id: Option<String>,
    /// Locale the list was last refreshed for.
    pub locale: Option<String>,
    /// Refreshes triggered by network changes.
    pub refreshes: u32,
}

pub struct GetState;

impl ActionDef for GetState {
    const NAME: &'static str = "TokenListController:getState";
    type Params = ();
    type Output = TokenListState;
}

pub struct TokenListController {
    messenger: Messenger,
    state: Arc<RwLock<TokenListState>>,
}

impl TokenListController {
    pub fn new(messenger: Messenger) -> Result<Arc<Self>, MessengerError> {
        let state = Arc::new(RwLock::new(TokenListState::default()));

        let reader = Arc::clone(&state);
        messenger.register_action::<GetState, _>(move |()| Ok(reader.read().clone()))?;

        let writer = Arc::clone(&state);
        let caller = messenger.downgrade();
        messenger.subscribe_event::<network::NetworkDidChange, _>(move |network| {
            let messenger = caller.upgrade().ok_or_else(|| controller_gone(NAMESPACE))?;
            let preferences = messenger.call_action_sync::<preferences::GetState>(())?;
            if !preferences.use_token_detection {
                debug!(chain_id = %network.chain_id, "Token detection disabled, skipping refresh");
                return Ok(());
            }

            let mut state = writer.write();
            state.chain_id = Some(network.chain_id);
            state.locale = Some(preferences.current_locale);
            state.refreshes += 1;
            info!(chain_id = ?state.chain_id, refreshes = state.refreshes, "Token list refreshed");
            Ok(())
        })?;

        Ok(Arc::new(Self { messenger, state }))
    }

    pub fn factory(messenger: Messenger) -> Result<Arc<dyn Controller>, MessengerError> {
        let controller: Arc<dyn Controller> = Self::new(messenger)?;
        Ok(controller)
    }

    pub fn state(&self) -> TokenListState {
        self.state.read().clone()
    }

    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }
}

#[async_trait]
impl Controller for TokenListController {
    fn namespace(&self) -> &'static str {
        NAMESPACE
    }

    async fn init(&self, init: &Messenger) -> anyhow::Result<()> {
        let network = init.call_action::<network::GetState>(()).await?;
        self.state.write().chain_id = Some(network.chain_id);
        Ok(())
    }
}
