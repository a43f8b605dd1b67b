//! # Outbound Ports
//!
//! What a synchronizer needs from the session layer. The store itself is
//! the shared [`shared_store::PersistentStore`] port.

use async_trait::async_trait;

/// Session hooks used after creates and on rejected credentials.
#[async_trait]
pub trait SessionLink: Send + Sync {
    /// Re-run the session's existence check. `true` when it completed.
    async fn refresh(&self) -> bool;

    /// The store rejected `operation` as unauthorized.
    async fn signal_unauthorized(&self, operation: &str);
}
