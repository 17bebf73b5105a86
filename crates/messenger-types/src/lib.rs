//! # Messenger Types
//!
//! Names, grants, typed definitions and the error taxonomy shared by the
//! messenger bus and everything wired onto it.
//!
//! ## Design Principles
//!
//! - **Qualified Names**: Every action and event is `"<Namespace>:<member>"`.
//! - **Deny by Default**: A grant lists what a restricted messenger may reach;
//!   everything else fails with a capability error.
//! - **Typed on Top**: `ActionDef`/`EventDef` give compile-time payload types
//!   while routing stays name-based.

pub mod definitions;
pub mod errors;
pub mod grant;
pub mod names;

pub use definitions::{ActionDef, EventDef};
pub use errors::MessengerError;
pub use grant::Grant;
pub use names::{Namespace, QualifiedName, NAME_SEPARATOR};
