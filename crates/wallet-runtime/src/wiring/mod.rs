//! # Controller Wiring
//!
//! The delegation graph between controllers and the checks that keep it
//! honest.
//!
//! ## Flow
//!
//! ```text
//! manifest.json ──→ DelegationManifest ──→ ControllerGrant (per namespace)
//!                                               │
//!                     ┌─────────────────────────┴──────────────────────┐
//!                     ▼                                                ▼
//!          runtime_config() ──→ runtime messenger        init_config() ──→ init messenger
//!                     │                                                │
//!                     ▼                                                ▼
//!          controller registers actions ──→ unresolved_actions()  ──→ init, then disposed
//! ```

pub mod manifest;
pub mod validation;

pub use manifest::{ControllerGrant, DelegationManifest};
pub use validation::{unresolved_actions, UnresolvedGrant};
