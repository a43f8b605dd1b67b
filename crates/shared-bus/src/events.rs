//! # Change Events
//!
//! Row-level change notifications and the per-owner filter that scopes a
//! channel.

use serde::{Deserialize, Serialize};
use shared_types::{EntityKind, EntityRecord, OwnerId, ServerTimestamp};

/// What happened to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// One change notification.
///
/// For `Delete` the row carries the last known values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub op: ChangeOp,
    pub row: EntityRecord,
    /// Server timestamp of the write that produced this event.
    pub server_ts: ServerTimestamp,
}

impl ChangeEvent {
    #[must_use]
    pub fn new(op: ChangeOp, row: EntityRecord, server_ts: ServerTimestamp) -> Self {
        Self { op, row, server_ts }
    }

    /// Kind of the changed row.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.row.kind()
    }

    /// Owner of the changed row.
    #[must_use]
    pub fn owner_id(&self) -> OwnerId {
        self.row.owner_id()
    }
}

/// Server-side filter for one channel: a set of kinds for one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFilter {
    pub kinds: Vec<EntityKind>,
    pub owner_id: OwnerId,
}

impl ChangeFilter {
    /// Filter for a single kind.
    #[must_use]
    pub fn single(kind: EntityKind, owner_id: OwnerId) -> Self {
        Self {
            kinds: vec![kind],
            owner_id,
        }
    }

    /// Filter for several kinds of the same owner.
    #[must_use]
    pub fn kinds(kinds: Vec<EntityKind>, owner_id: OwnerId) -> Self {
        let mut kinds = kinds;
        kinds.sort();
        kinds.dedup();
        Self { kinds, owner_id }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.owner_id() == self.owner_id && self.kinds.contains(&event.kind())
    }

    /// Stable key identifying the channel, used for subscription tracking.
    #[must_use]
    pub fn channel_key(&self) -> String {
        let kinds: Vec<&str> = self.kinds.iter().map(EntityKind::as_str).collect();
        format!("{}:{}", kinds.join("+"), self.owner_id)
    }
}
