//! # UI Surfaces
//!
//! What the rendering layer consumes: hooks over the session and the
//! synchronizers, the gate-driven navigator and the setup-wizard flows.

pub mod hooks;
pub mod navigator;
pub mod onboarding;

pub use hooks::{EntityHook, IdentityHook, SyncedEntity};
pub use navigator::{Location, Navigator};
pub use onboarding::{FlowError, FlowOutcome, STARTING_COINS};
