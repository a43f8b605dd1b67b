//! # Wiring
//!
//! Adapters that implement one subsystem's outbound port on top of
//! another, and the task that keeps the synchronizers on the current
//! identity.
//!
//! ```text
//! SessionManager ──watch──→ route_identity ──load/detach──→ 4 × EntitySynchronizer
//!       ▲                                                          │
//!       └───────────── SessionBridge (refresh / unauthorized) ─────┘
//! ```

pub mod identity_routing;
pub mod session_link;

pub use identity_routing::{route_identity, Synchronizers};
pub use session_link::SessionBridge;
