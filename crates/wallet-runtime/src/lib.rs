//! # Wallet Runtime Library
//!
//! Boot-time wiring of the wallet controllers over the messenger bus. The
//! main entry point is the `main.rs` binary; the modules are public for
//! integration tests.
//!
//! ## Architectural Patterns
//!
//! - **Capabilities, not references**: controllers reach each other only
//!   through restricted messengers
//! - **Manifest-driven**: who may call what is data (`DelegationManifest`)
//! - **Fail at boot**: wiring errors stop the runtime before any `init`

// Additional allows to match CI configuration
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_lines)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod container;
pub mod controllers;
pub mod errors;
pub mod telemetry;
pub mod wiring;

pub use container::{RuntimeConfig, WalletRuntime, WiringSummary};
pub use controllers::{Controller, ControllerFactory, ControllerStatus};
pub use errors::RuntimeError;
pub use wiring::{ControllerGrant, DelegationManifest};
