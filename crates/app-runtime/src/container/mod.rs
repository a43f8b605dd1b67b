//! # Application Container
//!
//! Holds one instance's subsystems with their lifetime management and
//! dependency injection.

pub mod config;
pub mod instance;

pub use config::{AppConfig, ConfigError};
pub use instance::{AppInstance, INITIAL_ROUTE};
