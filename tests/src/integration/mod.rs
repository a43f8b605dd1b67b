//! # Integration Scenarios
//!
//! Every scenario runs real subsystems over the in-memory store and auth
//! adapters; nothing is mocked below the `PersistentStore` port.

pub mod support;

mod cross_instance;
mod failures;
mod onboarding;
