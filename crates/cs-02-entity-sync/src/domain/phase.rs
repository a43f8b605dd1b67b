//! # Synchronizer Lifecycle
//!
//! ```text
//! Uninitialized ──load──→ Loading ──→ Present | Absent
//!                                        │
//!                                  mutate/create
//!                                        ▼
//!                            Mutating { prior } ──commit──→ Present
//!                                        └────rollback────→ prior
//! ```
//!
//! A failed mutation always returns to the settled phase it started from,
//! never to `Loading`.

use serde::{Deserialize, Serialize};

/// Settled outcome of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settled {
    Present,
    Absent,
}

impl Settled {
    #[must_use]
    pub fn from_found(found: bool) -> Self {
        if found {
            Settled::Present
        } else {
            Settled::Absent
        }
    }
}

impl From<Settled> for SyncPhase {
    fn from(settled: Settled) -> Self {
        match settled {
            Settled::Present => SyncPhase::Present,
            Settled::Absent => SyncPhase::Absent,
        }
    }
}

/// Where a synchronizer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncPhase {
    #[default]
    Uninitialized,
    Loading,
    Present,
    Absent,
    Mutating { prior: Settled },
}

impl SyncPhase {
    /// Present or Absent.
    #[must_use]
    pub fn settled(&self) -> Option<Settled> {
        match self {
            SyncPhase::Present => Some(Settled::Present),
            SyncPhase::Absent => Some(Settled::Absent),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, SyncPhase::Loading)
    }

    #[must_use]
    pub fn is_mutating(&self) -> bool {
        matches!(self, SyncPhase::Mutating { .. })
    }

    /// Enter `Mutating`. Only a settled phase may start a mutation.
    #[must_use]
    pub fn begin_mutation(&self) -> Option<SyncPhase> {
        self.settled().map(|prior| SyncPhase::Mutating { prior })
    }

    /// Leave `Mutating` after the write was persisted.
    #[must_use]
    pub fn commit(&self) -> SyncPhase {
        SyncPhase::Present
    }

    /// Leave `Mutating` after the write failed.
    #[must_use]
    pub fn rollback(&self) -> SyncPhase {
        match self {
            SyncPhase::Mutating { prior } => (*prior).into(),
            other => *other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_requires_settled_phase() {
        assert_eq!(SyncPhase::Uninitialized.begin_mutation(), None);
        assert_eq!(SyncPhase::Loading.begin_mutation(), None);
        assert_eq!(
            SyncPhase::Present.begin_mutation(),
            Some(SyncPhase::Mutating {
                prior: Settled::Present
            })
        );
    }

    #[test]
    fn test_rollback_returns_to_prior_never_loading() {
        let from_absent = SyncPhase::Absent.begin_mutation().unwrap();
        assert_eq!(from_absent.rollback(), SyncPhase::Absent);
        assert_eq!(from_absent.commit(), SyncPhase::Present);

        let from_present = SyncPhase::Present.begin_mutation().unwrap();
        assert_eq!(from_present.rollback(), SyncPhase::Present);
    }
}
