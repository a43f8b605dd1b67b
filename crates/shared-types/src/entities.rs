//! # Core Domain Entities
//!
//! Identity-owned records and the tagged variants used to move them through
//! the store and the change bus.
//!
//! ## Kinds
//!
//! - **Profile**: created once per identity, never deleted in normal flow
//! - **Pet**: created once via the setup wizard, stats clamped to [0,100]
//! - **Ledger**: append-only transaction log with a derived balance
//! - **Preferences**: boolean toggles, default-initialized on first read

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::ValidationError;
use crate::ledger::{Ledger, LedgerPatch};
use crate::pet::{Pet, PetPatch};
use crate::preferences::{Preferences, PreferencesPatch};
use crate::profile::{Profile, ProfilePatch};

/// Milliseconds since the Unix epoch as assigned by the store.
///
/// Strictly monotonic per store; the only ordering key for merges.
pub type ServerTimestamp = u64;

/// Identifier of the identity that exclusively owns a set of entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(pub Uuid);

impl OwnerId {
    /// Generate a fresh random owner id.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for OwnerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// The four entity kinds owned 1:1 by an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Profile,
    Pet,
    Ledger,
    Preferences,
}

impl EntityKind {
    /// All kinds, in onboarding order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Profile,
        EntityKind::Pet,
        EntityKind::Ledger,
        EntityKind::Preferences,
    ];

    /// Table-style name used in logs and metric labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Profile => "profile",
            EntityKind::Pet => "pet",
            EntityKind::Ledger => "ledger",
            EntityKind::Preferences => "preferences",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behaviour every synchronized entity kind provides.
///
/// The synchronizer is generic over this trait; each implementor is bound to
/// exactly one [`EntityKind`] and one patch type.
pub trait Entity: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// The tag this type is stored under.
    const KIND: EntityKind;

    /// Partial update accepted by `update`.
    type Patch: Clone + fmt::Debug + Send + Sync + 'static;

    /// Owning identity.
    fn owner_id(&self) -> OwnerId;

    /// Server timestamp of the last persisted write.
    fn updated_at(&self) -> ServerTimestamp;

    /// Apply a patch in place. `at` stamps any per-item timestamps the patch
    /// creates (ledger transactions); it does not touch `updated_at`.
    fn apply_patch(&mut self, patch: &Self::Patch, at: ServerTimestamp);

    /// Check the record's field-level invariants.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Bring a freshly built record into range before it is persisted.
    fn normalize(&mut self) {}

    /// Row to insert when a read finds nothing. `None` means absence is a
    /// normal, user-visible outcome.
    fn default_for(_owner: OwnerId) -> Option<Self> {
        None
    }

    /// Wrap into the tagged record.
    fn into_record(self) -> EntityRecord;

    /// Unwrap from the tagged record, `None` on kind mismatch.
    fn from_record(record: EntityRecord) -> Option<Self>;

    /// Wrap a patch into the tagged patch.
    fn wrap_patch(patch: Self::Patch) -> EntityPatch;
}

/// A row of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityRecord {
    Profile(Profile),
    Pet(Pet),
    Ledger(Ledger),
    Preferences(Preferences),
}

impl EntityRecord {
    /// Tag of the contained row.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRecord::Profile(_) => EntityKind::Profile,
            EntityRecord::Pet(_) => EntityKind::Pet,
            EntityRecord::Ledger(_) => EntityKind::Ledger,
            EntityRecord::Preferences(_) => EntityKind::Preferences,
        }
    }

    /// Owner of the contained row.
    #[must_use]
    pub fn owner_id(&self) -> OwnerId {
        match self {
            EntityRecord::Profile(r) => r.owner_id(),
            EntityRecord::Pet(r) => r.owner_id(),
            EntityRecord::Ledger(r) => r.owner_id(),
            EntityRecord::Preferences(r) => r.owner_id(),
        }
    }

    /// Server timestamp of the contained row.
    #[must_use]
    pub fn updated_at(&self) -> ServerTimestamp {
        match self {
            EntityRecord::Profile(r) => r.updated_at(),
            EntityRecord::Pet(r) => r.updated_at(),
            EntityRecord::Ledger(r) => r.updated_at(),
            EntityRecord::Preferences(r) => r.updated_at(),
        }
    }

    /// Field-level validation of the contained row.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            EntityRecord::Profile(r) => r.validate(),
            EntityRecord::Pet(r) => r.validate(),
            EntityRecord::Ledger(r) => r.validate(),
            EntityRecord::Preferences(r) => r.validate(),
        }
    }

    /// Stamp server-owned fields on first insert.
    pub fn stamp_insert(&mut self, at: ServerTimestamp) {
        match self {
            EntityRecord::Profile(profile) => profile.created_at = at,
            // Opening transactions are built client-side without a stamp.
            EntityRecord::Ledger(ledger) => ledger
                .transactions
                .iter_mut()
                .filter(|tx| tx.timestamp == 0)
                .for_each(|tx| tx.timestamp = at),
            _ => {}
        }
        self.stamp_update(at);
    }

    /// Stamp `updated_at` after a write.
    pub fn stamp_update(&mut self, at: ServerTimestamp) {
        match self {
            EntityRecord::Profile(r) => r.updated_at = at,
            EntityRecord::Pet(r) => r.updated_at = at,
            EntityRecord::Ledger(r) => r.updated_at = at,
            EntityRecord::Preferences(r) => r.updated_at = at,
        }
    }

    /// Apply a tagged patch, rejecting a kind mismatch.
    pub fn apply_patch(
        &mut self,
        patch: &EntityPatch,
        at: ServerTimestamp,
    ) -> Result<(), ValidationError> {
        match (self, patch) {
            (EntityRecord::Profile(r), EntityPatch::Profile(p)) => r.apply_patch(p, at),
            (EntityRecord::Pet(r), EntityPatch::Pet(p)) => r.apply_patch(p, at),
            (EntityRecord::Ledger(r), EntityPatch::Ledger(p)) => r.apply_patch(p, at),
            (EntityRecord::Preferences(r), EntityPatch::Preferences(p)) => r.apply_patch(p, at),
            (record, patch) => {
                return Err(ValidationError::KindMismatch {
                    expected: record.kind(),
                    actual: patch.kind(),
                })
            }
        }
        Ok(())
    }
}

/// A partial update of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityPatch {
    Profile(ProfilePatch),
    Pet(PetPatch),
    Ledger(LedgerPatch),
    Preferences(PreferencesPatch),
}

impl EntityPatch {
    /// Tag of the contained patch.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityPatch::Profile(_) => EntityKind::Profile,
            EntityPatch::Pet(_) => EntityKind::Pet,
            EntityPatch::Ledger(_) => EntityKind::Ledger,
            EntityPatch::Preferences(_) => EntityKind::Preferences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pet::PetStats;

    #[test]
    fn test_kind_names() {
        assert_eq!(EntityKind::Profile.to_string(), "profile");
        assert_eq!(EntityKind::Preferences.as_str(), "preferences");
        assert_eq!(EntityKind::ALL.len(), 4);
    }

    #[test]
    fn test_record_round_trip_through_trait() {
        let owner = OwnerId::random();
        let pet = Pet::hatch(owner, "dragon", "ember", "Sparky");
        let record = pet.clone().into_record();
        assert_eq!(record.kind(), EntityKind::Pet);
        assert_eq!(record.owner_id(), owner);
        assert_eq!(Pet::from_record(record), Some(pet));
    }

    #[test]
    fn test_record_json_is_tagged_by_kind() {
        let owner = OwnerId::random();
        let record = Ledger::opening(owner, 100, "welcome_grant").into_record();
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("Ledger").is_some());
        let back: EntityRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_from_record_kind_mismatch() {
        let owner = OwnerId::random();
        let record = Preferences::defaults(owner).into_record();
        assert!(Pet::from_record(record).is_none());
    }

    #[test]
    fn test_apply_patch_kind_mismatch_rejected() {
        let owner = OwnerId::random();
        let mut record = Profile::new(owner, "river").into_record();
        let patch = EntityPatch::Pet(PetPatch {
            stats: Some(PetStats::full()),
            ..Default::default()
        });
        let err = record.apply_patch(&patch, 10).unwrap_err();
        assert!(matches!(err, ValidationError::KindMismatch { .. }));
    }

    #[test]
    fn test_stamp_insert_sets_profile_created_at() {
        let owner = OwnerId::random();
        let mut record = Profile::new(owner, "river").into_record();
        record.stamp_insert(42);
        match record {
            EntityRecord::Profile(p) => {
                assert_eq!(p.created_at, 42);
                assert_eq!(p.updated_at, 42);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }
}
