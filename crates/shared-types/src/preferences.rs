//! Preferences: boolean toggles, default-initialized on first read.

use serde::{Deserialize, Serialize};

use crate::entities::{Entity, EntityKind, EntityPatch, EntityRecord, OwnerId, ServerTimestamp};
use crate::errors::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub owner_id: OwnerId,
    pub sound_enabled: bool,
    pub music_enabled: bool,
    pub notifications_enabled: bool,
    pub daily_reminders: bool,
    pub reduced_motion: bool,
    pub updated_at: ServerTimestamp,
}

impl Preferences {
    /// Defaults for a first read.
    #[must_use]
    pub fn defaults(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            sound_enabled: true,
            music_enabled: true,
            notifications_enabled: true,
            daily_reminders: true,
            reduced_motion: false,
            updated_at: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesPatch {
    pub sound_enabled: Option<bool>,
    pub music_enabled: Option<bool>,
    pub notifications_enabled: Option<bool>,
    pub daily_reminders: Option<bool>,
    pub reduced_motion: Option<bool>,
}

impl Entity for Preferences {
    const KIND: EntityKind = EntityKind::Preferences;
    type Patch = PreferencesPatch;

    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    fn updated_at(&self) -> ServerTimestamp {
        self.updated_at
    }

    fn apply_patch(&mut self, patch: &PreferencesPatch, _at: ServerTimestamp) {
        let toggles = [
            (&mut self.sound_enabled, patch.sound_enabled),
            (&mut self.music_enabled, patch.music_enabled),
            (&mut self.notifications_enabled, patch.notifications_enabled),
            (&mut self.daily_reminders, patch.daily_reminders),
            (&mut self.reduced_motion, patch.reduced_motion),
        ];
        for (field, value) in toggles {
            if let Some(value) = value {
                *field = value;
            }
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        // Reminders ride on notifications.
        if self.daily_reminders && !self.notifications_enabled {
            return Err(ValidationError::field(
                "daily_reminders",
                "requires notifications to be enabled",
            ));
        }
        Ok(())
    }

    fn default_for(owner: OwnerId) -> Option<Self> {
        Some(Self::defaults(owner))
    }

    fn into_record(self) -> EntityRecord {
        EntityRecord::Preferences(self)
    }

    fn from_record(record: EntityRecord) -> Option<Self> {
        match record {
            EntityRecord::Preferences(prefs) => Some(prefs),
            _ => None,
        }
    }

    fn wrap_patch(patch: PreferencesPatch) -> EntityPatch {
        EntityPatch::Preferences(patch)
    }
}
