//! Pet record, stat vector and derived mood.
//!
//! Every stat lives in `[STAT_MIN, STAT_MAX]`. Stats are clamped whenever a
//! new vector is produced, so no write path can persist an out-of-range value.

use serde::{Deserialize, Serialize};

use crate::entities::{Entity, EntityKind, EntityPatch, EntityRecord, OwnerId, ServerTimestamp};
use crate::errors::ValidationError;

/// Lowest legal stat value.
pub const STAT_MIN: u8 = 0;

/// Highest legal stat value.
pub const STAT_MAX: u8 = 100;

/// Maximum pet name length.
pub const PET_NAME_MAX_LEN: usize = 20;

fn clamp_stat(value: i32) -> u8 {
    // Bounds are 0..=100 so the cast cannot truncate.
    value.clamp(i32::from(STAT_MIN), i32::from(STAT_MAX)) as u8
}

/// The pet's five care stats. Higher is always better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetStats {
    pub health: u8,
    pub hunger: u8,
    pub happiness: u8,
    pub cleanliness: u8,
    pub energy: u8,
}

impl PetStats {
    /// Build a stat vector, clamping every component.
    #[must_use]
    pub fn new(health: i32, hunger: i32, happiness: i32, cleanliness: i32, energy: i32) -> Self {
        Self {
            health: clamp_stat(health),
            hunger: clamp_stat(hunger),
            happiness: clamp_stat(happiness),
            cleanliness: clamp_stat(cleanliness),
            energy: clamp_stat(energy),
        }
    }

    /// All stats at maximum.
    #[must_use]
    pub fn full() -> Self {
        Self::new(100, 100, 100, 100, 100)
    }

    /// Copy with every component forced into range.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self::new(
            i32::from(self.health),
            i32::from(self.hunger),
            i32::from(self.happiness),
            i32::from(self.cleanliness),
            i32::from(self.energy),
        )
    }

    /// Apply signed deltas, saturating at the range bounds.
    #[must_use]
    pub fn with_deltas(&self, deltas: &StatDeltas) -> Self {
        Self::new(
            i32::from(self.health).saturating_add(deltas.health),
            i32::from(self.hunger).saturating_add(deltas.hunger),
            i32::from(self.happiness).saturating_add(deltas.happiness),
            i32::from(self.cleanliness).saturating_add(deltas.cleanliness),
            i32::from(self.energy).saturating_add(deltas.energy),
        )
    }

    /// True when every component is within range.
    #[must_use]
    pub fn in_range(&self) -> bool {
        self.as_array().iter().all(|v| (STAT_MIN..=STAT_MAX).contains(v))
    }

    fn as_array(&self) -> [u8; 5] {
        [
            self.health,
            self.hunger,
            self.happiness,
            self.cleanliness,
            self.energy,
        ]
    }

    /// Mood derived from the stat vector.
    #[must_use]
    pub fn mood(&self) -> Mood {
        let values = self.as_array();
        let lowest = values.iter().copied().min().unwrap_or(STAT_MIN);
        let average = values.iter().map(|v| u32::from(*v)).sum::<u32>() / values.len() as u32;

        if lowest < 15 {
            Mood::Distressed
        } else if average >= 80 {
            Mood::Joyful
        } else if average >= 55 {
            Mood::Content
        } else if average >= 30 {
            Mood::Grumpy
        } else {
            Mood::Distressed
        }
    }
}

impl Default for PetStats {
    fn default() -> Self {
        Self::new(100, 80, 80, 80, 100)
    }
}

/// Signed stat changes requested by a collaborator (minigame, shop item...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatDeltas {
    pub health: i32,
    pub hunger: i32,
    pub happiness: i32,
    pub cleanliness: i32,
    pub energy: i32,
}

impl StatDeltas {
    /// True when no stat changes.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// How the pet feels. Always derived, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    Joyful,
    Content,
    Grumpy,
    Distressed,
}

/// The identity's single pet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub owner_id: OwnerId,
    pub species: String,
    pub breed: String,
    pub name: String,
    pub stats: PetStats,
    pub level: u32,
    pub experience: u64,
    pub updated_at: ServerTimestamp,
}

impl Pet {
    /// A freshly hatched level-1 pet with default stats.
    #[must_use]
    pub fn hatch(
        owner_id: OwnerId,
        species: impl Into<String>,
        breed: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            owner_id,
            species: species.into(),
            breed: breed.into(),
            name: name.into(),
            stats: PetStats::default(),
            level: 1,
            experience: 0,
            updated_at: 0,
        }
    }

    /// Mood derived from the current stats.
    #[must_use]
    pub fn mood(&self) -> Mood {
        self.stats.mood()
    }
}

/// Partial pet update. Stats are replaced wholesale and clamped on apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetPatch {
    pub name: Option<String>,
    pub breed: Option<String>,
    pub stats: Option<PetStats>,
    pub level: Option<u32>,
    pub experience: Option<u64>,
}

impl Entity for Pet {
    const KIND: EntityKind = EntityKind::Pet;
    type Patch = PetPatch;

    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    fn updated_at(&self) -> ServerTimestamp {
        self.updated_at
    }

    fn apply_patch(&mut self, patch: &PetPatch, _at: ServerTimestamp) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(breed) = &patch.breed {
            self.breed = breed.clone();
        }
        if let Some(stats) = patch.stats {
            self.stats = stats.clamped();
        }
        if let Some(level) = patch.level {
            self.level = level;
        }
        if let Some(experience) = patch.experience {
            self.experience = experience;
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.species.trim().is_empty() {
            return Err(ValidationError::field("species", "must not be blank"));
        }
        let name_len = self.name.trim().chars().count();
        if name_len == 0 || name_len > PET_NAME_MAX_LEN {
            return Err(ValidationError::field(
                "name",
                format!("must be 1-{PET_NAME_MAX_LEN} characters"),
            ));
        }
        if self.level == 0 {
            return Err(ValidationError::field("level", "must be at least 1"));
        }
        if !self.stats.in_range() {
            return Err(ValidationError::field("stats", "out of range"));
        }
        Ok(())
    }

    fn normalize(&mut self) {
        self.stats = self.stats.clamped();
    }

    fn into_record(self) -> EntityRecord {
        EntityRecord::Pet(self)
    }

    fn from_record(record: EntityRecord) -> Option<Self> {
        match record {
            EntityRecord::Pet(pet) => Some(pet),
            _ => None,
        }
    }

    fn wrap_patch(patch: PetPatch) -> EntityPatch {
        EntityPatch::Pet(patch)
    }
}
