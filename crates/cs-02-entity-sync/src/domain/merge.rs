//! Last-write-wins merge of remote rows into the local copy.
//!
//! Ordering is by server timestamp only. Equal timestamps are treated as
//! the same write, which makes replaying an event a no-op.

use shared_bus::ChangeOp;
use shared_types::ServerTimestamp;

/// Outcome of comparing a remote write against the local copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// Remote row is newer: replace the local copy.
    Apply,
    /// Remote delete is newer: clear the local copy.
    Remove,
    /// Remote write is not newer: ignore.
    Stale,
}

impl MergeDecision {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeDecision::Apply => "applied",
            MergeDecision::Remove => "removed",
            MergeDecision::Stale => "stale",
        }
    }
}

/// Decide what a remote write does to a local copy last written at `local`.
#[must_use]
pub fn decide(local: Option<ServerTimestamp>, op: ChangeOp, remote: ServerTimestamp) -> MergeDecision {
    match (op, local) {
        (ChangeOp::Delete, None) => MergeDecision::Stale,
        (ChangeOp::Delete, Some(at)) if remote >= at => MergeDecision::Remove,
        (ChangeOp::Delete, Some(_)) => MergeDecision::Stale,
        (_, None) => MergeDecision::Apply,
        (_, Some(at)) if remote > at => MergeDecision::Apply,
        _ => MergeDecision::Stale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_write_wins() {
        assert_eq!(decide(Some(10), ChangeOp::Update, 11), MergeDecision::Apply);
        assert_eq!(decide(Some(10), ChangeOp::Update, 9), MergeDecision::Stale);
        assert_eq!(decide(None, ChangeOp::Insert, 1), MergeDecision::Apply);
    }

    #[test]
    fn test_same_timestamp_is_a_replay() {
        assert_eq!(decide(Some(10), ChangeOp::Update, 10), MergeDecision::Stale);
        assert_eq!(decide(Some(10), ChangeOp::Insert, 10), MergeDecision::Stale);
    }

    #[test]
    fn test_delete_needs_a_local_copy() {
        assert_eq!(decide(None, ChangeOp::Delete, 5), MergeDecision::Stale);
        assert_eq!(decide(Some(4), ChangeOp::Delete, 5), MergeDecision::Remove);
        assert_eq!(decide(Some(6), ChangeOp::Delete, 5), MergeDecision::Stale);
    }
}
