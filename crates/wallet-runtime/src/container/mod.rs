//! # Controller Container
//!
//! Runtime configuration and the host that boots the controllers.
//!
//! - Controllers are constructed in factory order, each around its own
//!   restricted messenger
//! - Only the container holds the root messenger
//! - Boot fails before `init` if the wiring cannot work

pub mod config;
pub mod runtime;

pub use config::{ConfigError, LoggingConfig, RuntimeConfig, WiringConfig};
pub use runtime::{ControllerSummary, HostedController, WalletRuntime, WiringSummary};
