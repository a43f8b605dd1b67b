//! Identity and derived onboarding flags.

use serde::{Deserialize, Serialize};
use shared_types::OwnerId;

/// Outcome of one existence lookup.
///
/// `Unknown` means the lookup could not complete (every attempt failed or
/// the last one did). It is never treated as a confirmed absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Existence {
    Present,
    Absent,
    #[default]
    Unknown,
}

impl Existence {
    #[must_use]
    pub fn is_present(self) -> bool {
        self == Existence::Present
    }

    /// Only a completed lookup that found nothing counts.
    #[must_use]
    pub fn is_confirmed_absent(self) -> bool {
        self == Existence::Absent
    }

    #[must_use]
    pub fn is_unknown(self) -> bool {
        self == Existence::Unknown
    }

    #[must_use]
    pub fn from_found(found: bool) -> Self {
        if found {
            Existence::Present
        } else {
            Existence::Absent
        }
    }
}

/// Result of checking the identity's Profile and Pet rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExistenceReport {
    pub has_profile: Existence,
    pub has_pet: Existence,
}

impl ExistenceReport {
    #[must_use]
    pub fn new(has_profile: Existence, has_pet: Existence) -> Self {
        Self {
            has_profile,
            has_pet,
        }
    }

    /// Nothing known yet.
    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Both lookups completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.has_profile.is_unknown() && !self.has_pet.is_unknown()
    }
}

/// The signed-in identity.
///
/// `is_new_user` and `has_pet` are recomputed from existence checks and
/// never persisted. Both are pessimistic: an unknown profile counts as a new
/// user, an unknown pet as no pet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: OwnerId,
    pub email: String,
    pub display_name: Option<String>,
    pub is_new_user: bool,
    pub has_pet: bool,
}

impl Identity {
    /// Identity whose flags have not been determined yet.
    #[must_use]
    pub fn undetermined(id: OwnerId, email: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name,
            is_new_user: true,
            has_pet: false,
        }
    }

    /// Recompute the derived flags from a report.
    pub fn apply_report(&mut self, report: &ExistenceReport) {
        self.is_new_user = !report.has_profile.is_present();
        self.has_pet = report.has_pet.is_present();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_is_not_absent() {
        assert!(!Existence::Unknown.is_confirmed_absent());
        assert!(!Existence::Unknown.is_present());
        assert!(Existence::Absent.is_confirmed_absent());
    }

    #[test]
    fn test_report_completeness() {
        assert!(!ExistenceReport::unknown().is_complete());
        assert!(ExistenceReport::new(Existence::Present, Existence::Absent).is_complete());
        assert!(!ExistenceReport::new(Existence::Present, Existence::Unknown).is_complete());
    }

    #[test]
    fn test_flags_are_pessimistic() {
        let mut identity = Identity::undetermined(OwnerId::random(), "a@b.c", None);
        identity.apply_report(&ExistenceReport::new(Existence::Unknown, Existence::Unknown));
        assert!(identity.is_new_user);
        assert!(!identity.has_pet);

        identity.apply_report(&ExistenceReport::new(Existence::Present, Existence::Present));
        assert!(!identity.is_new_user);
        assert!(identity.has_pet);
    }
}
