//! # Messenger Bus - Capability-Scoped Pub/Sub
//!
//! Lets independently developed controllers call each other's actions and
//! listen to each other's events without direct references.
//!
//! ## Architecture Rules
//!
//! - **Root Owns the Bus:** `Messenger::root()` builds a fresh registry; there
//!   is no process-wide singleton.
//! - **Restricted Views:** controllers only ever see a `Messenger` carved out
//!   of the root with an explicit allow-list.
//! - **Deny Loudly:** calls or subscriptions outside the grant fail with
//!   `ActionNotAllowed` / `EventNotAllowed`.
//!
//! ```text
//! ┌──────────────┐  call("A:getX")   ┌──────────────┐   lookup    ┌──────────────┐
//! │ Controller B │ ────────────────→ │ Restricted B │ ──────────→ │  Dispatcher  │
//! └──────────────┘                   │ (grant check)│             └──────┬───────┘
//!                                    └──────────────┘                    │
//!                                                                        ▼
//! ┌──────────────┐  publish("A:changed")                         ┌──────────────┐
//! │ Controller A │ ─────────────────────→ Event Bus ──fan-out──→ │ subscribers  │
//! └──────────────┘                                               └──────────────┘
//! ```
//!
//! ## Error Contract
//!
//! - `call` propagates the handler's error to the caller.
//! - `publish` isolates each subscriber; failures go to the `ErrorReporter`.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod delegation;
pub mod dispatcher;
pub mod event_bus;
pub mod handler;
pub mod messenger;
pub mod registry;
pub mod reporter;
pub mod typed;

// Re-export main types
pub use delegation::Delegation;
pub use dispatcher::ActionDispatcher;
pub use event_bus::EventBus;
pub use handler::{event_handler, ActionFuture, ActionHandler, ActionResult, EventHandler, PayloadGetter};
pub use messenger::{ActionRegistration, Messenger, RestrictedMessengerConfig, WeakMessenger, ROOT_LABEL};
pub use messenger_types::{ActionDef, EventDef, Grant, MessengerError, Namespace, QualifiedName};
pub use registry::NamespaceRegistry;
pub use reporter::{CollectingErrorReporter, ErrorReporter, ReportedError, TracingErrorReporter};
