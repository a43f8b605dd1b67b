//! # CS-03 Onboarding Gate
//!
//! Pure function from session state to route admissibility. No I/O, no
//! async, no state of its own: the navigator builds a [`GateInput`] from
//! the latest session snapshot on every navigation attempt.
//!
//! **Subsystem ID:** cs-03
//!
//! ## Stages
//!
//! ```text
//! Unauthenticated ──sign in──→ NeedsProfile ──create profile──→ NeedsPet ──create pet──→ Ready
//!      /sign-in                  /setup/profile                  /setup/pet               /
//! ```

#![allow(clippy::missing_const_for_fn)]

pub mod domain;
pub mod gate;

pub use domain::{GateInput, OnboardingState, Route};
pub use gate::{evaluate, GateDecision};

use cs_01_session_manager::SessionSnapshot;

/// Stage for display, from a session snapshot.
#[must_use]
pub fn current_state(snapshot: &SessionSnapshot) -> OnboardingState {
    GateInput::from(snapshot).current_state()
}
