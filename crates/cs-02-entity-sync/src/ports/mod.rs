//! # Ports Layer (Hexagonal Architecture)

pub mod inbound;
pub mod outbound;

pub use inbound::EntitySyncApi;
pub use outbound::SessionLink;
