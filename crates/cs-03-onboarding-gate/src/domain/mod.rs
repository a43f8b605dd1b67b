//! # Domain Layer

pub mod route;
pub mod state;

pub use route::Route;
pub use state::{GateInput, OnboardingState};
