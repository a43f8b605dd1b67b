//! # App Runtime Library
//!
//! Wires the session manager, the entity synchronizers and the onboarding
//! gate into one [`AppInstance`]. The `main.rs` binary is a demo over the
//! in-memory adapters.
//!
//! ## Modules
//!
//! | Module | Role |
//! |--------|------|
//! | `container` | `AppInstance` lifecycle and `AppConfig` |
//! | `wiring` | `SessionBridge` adapter, identity routing task |
//! | `ui` | hooks, gate-driven `Navigator`, setup-wizard flows |
//! | `gateway` | `CollaboratorGateway` for shop/minigame/coaching modules |

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod container;
pub mod gateway;
pub mod ui;
pub mod wiring;

pub use container::{AppConfig, AppInstance, ConfigError};
pub use gateway::CollaboratorGateway;
pub use ui::{EntityHook, FlowError, FlowOutcome, IdentityHook, Location, Navigator};
