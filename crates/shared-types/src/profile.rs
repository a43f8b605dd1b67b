//! Profile record: one per identity, created during onboarding.

use serde::{Deserialize, Serialize};

use crate::entities::{Entity, EntityKind, EntityPatch, EntityRecord, OwnerId, ServerTimestamp};
use crate::errors::ValidationError;

/// Minimum username length.
pub const USERNAME_MIN_LEN: usize = 3;

/// Maximum username length.
pub const USERNAME_MAX_LEN: usize = 24;

/// User-facing profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Owning identity (1:1).
    pub owner_id: OwnerId,
    /// Public handle.
    pub username: String,
    /// Reference to the chosen avatar asset.
    pub avatar_ref: Option<String>,
    /// Last coin balance copied from the ledger for display.
    pub coin_balance_snapshot: i64,
    /// Server timestamp of creation.
    pub created_at: ServerTimestamp,
    /// Server timestamp of the last write.
    pub updated_at: ServerTimestamp,
}

impl Profile {
    /// Build an unsaved profile. Timestamps are assigned by the store.
    #[must_use]
    pub fn new(owner_id: OwnerId, username: impl Into<String>) -> Self {
        Self {
            owner_id,
            username: username.into(),
            avatar_ref: None,
            coin_balance_snapshot: 0,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Builder-style avatar selection.
    #[must_use]
    pub fn with_avatar(mut self, avatar_ref: impl Into<String>) -> Self {
        self.avatar_ref = Some(avatar_ref.into());
        self
    }
}

/// Partial profile update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    pub username: Option<String>,
    /// `Some(None)` clears the avatar.
    pub avatar_ref: Option<Option<String>>,
    pub coin_balance_snapshot: Option<i64>,
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(ValidationError::field(
            "username",
            format!("must be {USERNAME_MIN_LEN}-{USERNAME_MAX_LEN} characters, got {len}"),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ValidationError::field(
            "username",
            "only letters, digits and underscores are allowed",
        ));
    }
    Ok(())
}

impl Entity for Profile {
    const KIND: EntityKind = EntityKind::Profile;
    type Patch = ProfilePatch;

    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    fn updated_at(&self) -> ServerTimestamp {
        self.updated_at
    }

    fn apply_patch(&mut self, patch: &ProfilePatch, _at: ServerTimestamp) {
        if let Some(username) = &patch.username {
            self.username = username.clone();
        }
        if let Some(avatar_ref) = &patch.avatar_ref {
            self.avatar_ref = avatar_ref.clone();
        }
        if let Some(snapshot) = patch.coin_balance_snapshot {
            self.coin_balance_snapshot = snapshot;
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_username(&self.username)?;
        if let Some(avatar) = &self.avatar_ref {
            if avatar.trim().is_empty() {
                return Err(ValidationError::field("avatar_ref", "must not be blank"));
            }
        }
        Ok(())
    }

    fn into_record(self) -> EntityRecord {
        EntityRecord::Profile(self)
    }

    fn from_record(record: EntityRecord) -> Option<Self> {
        match record {
            EntityRecord::Profile(profile) => Some(profile),
            _ => None,
        }
    }

    fn wrap_patch(patch: ProfilePatch) -> EntityPatch {
        EntityPatch::Profile(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_username() {
        let profile = Profile::new(OwnerId::random(), "pixel_tamer");
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_username_too_short() {
        let profile = Profile::new(OwnerId::random(), "ab");
        let err = profile.validate().unwrap_err();
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn test_username_rejects_symbols() {
        let profile = Profile::new(OwnerId::random(), "bad name!");
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_patch_clears_avatar() {
        let mut profile = Profile::new(OwnerId::random(), "river").with_avatar("fox-01");
        profile.apply_patch(
            &ProfilePatch {
                avatar_ref: Some(None),
                ..Default::default()
            },
            0,
        );
        assert!(profile.avatar_ref.is_none());
    }
}
