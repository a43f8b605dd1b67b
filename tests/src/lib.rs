//! # Companion-Sync Test Suite
//!
//! Unified test crate for scenarios that span more than one crate or more
//! than one application instance.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/
//! │   └── sync_benchmarks.rs   # merge, gate and mutation throughput
//! └── src/integration/
//!     ├── support.rs           # devices sharing one store
//!     ├── cross_instance.rs    # two instances, one owner
//!     ├── onboarding.rs        # gate, redirects, transition lock
//!     └── failures.rs          # rollback, unauthorized, severed channels
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cs-tests
//! cargo test -p cs-tests integration::onboarding::
//! cargo bench -p cs-tests
//! ```

#![allow(dead_code)]

pub mod integration;
