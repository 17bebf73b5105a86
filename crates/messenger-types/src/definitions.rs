//! # Typed Definitions
//!
//! Controllers describe the actions and events they own as types. The bus
//! still routes by name, so these definitions ride on top of the same
//! runtime allow-list checks as the string API.
//!
//! ```rust,ignore
//! struct GetState;
//!
//! impl ActionDef for GetState {
//!     const NAME: &'static str = "PreferencesController:getState";
//!     type Params = ();
//!     type Output = PreferencesState;
//! }
//! ```

use crate::errors::MessengerError;
use crate::names::QualifiedName;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A named action with typed parameters and output.
pub trait ActionDef: Send + Sync + 'static {
    const NAME: &'static str;
    type Params: Serialize + DeserializeOwned + Send + 'static;
    type Output: Serialize + DeserializeOwned + Send + 'static;

    fn name() -> Result<QualifiedName, MessengerError> {
        QualifiedName::parse(Self::NAME)
    }
}

/// A named event with a typed payload.
pub trait EventDef: Send + Sync + 'static {
    const NAME: &'static str;
    type Payload: Serialize + DeserializeOwned + Send + 'static;

    fn name() -> Result<QualifiedName, MessengerError> {
        QualifiedName::parse(Self::NAME)
    }
}
