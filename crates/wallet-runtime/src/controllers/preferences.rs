//! # Preferences Controller
//!
//! User preferences. Owns `PreferencesController:getState`,
//! `PreferencesController:setLocale` and publishes
//! `PreferencesController:stateChange`.

use std::sync::Arc;

use async_trait::async_trait;
use messenger_bus::{ActionDef, EventDef, Messenger, MessengerError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{controller_gone, Controller};

pub const NAMESPACE: &str = "PreferencesController";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesState {
    pub current_locale: String,
    pub use_token_detection: bool,
}

impl Default for PreferencesState {
    fn default() -> Self {
        Self {
            current_locale: "en-US".to_string(),
            use_token_detection: true,
        }
    }
}

pub struct GetState;

impl ActionDef for GetState {
    const NAME: &'static str = "PreferencesController:getState";
    type Params = ();
    type Output = PreferencesState;
}

pub struct SetLocale;

impl ActionDef for SetLocale {
    const NAME: &'static str = "PreferencesController:setLocale";
    type Params = String;
    type Output = PreferencesState;
}

pub struct StateChange;

impl EventDef for StateChange {
    const NAME: &'static str = "PreferencesController:stateChange";
    type Payload = PreferencesState;
}

pub struct PreferencesController {
    messenger: Messenger,
    state: Arc<RwLock<PreferencesState>>,
}

impl PreferencesController {
    pub fn new(messenger: Messenger) -> Result<Arc<Self>, MessengerError> {
        let state = Arc::new(RwLock::new(PreferencesState::default()));

        let reader = Arc::clone(&state);
        messenger.register_action::<GetState, _>(move |()| Ok(reader.read().clone()))?;

        let writer = Arc::clone(&state);
        let publisher = messenger.downgrade();
        messenger.register_action::<SetLocale, _>(move |locale| {
            if locale.trim().is_empty() {
                anyhow::bail!("locale must not be empty");
            }
            let snapshot = {
                let mut state = writer.write();
                state.current_locale = locale;
                state.clone()
            };
            let messenger = publisher.upgrade().ok_or_else(|| controller_gone(NAMESPACE))?;
            messenger.publish_event::<StateChange>(&snapshot)?;
            info!(locale = %snapshot.current_locale, "Locale updated");
            Ok(snapshot)
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

    pub fn state(&self) -> PreferencesState {
        self.state.read().clone()
    }

    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }
}

#[async_trait]
impl Controller for PreferencesController {
    fn namespace(&self) -> &'static str {
        NAMESPACE
    }
}
