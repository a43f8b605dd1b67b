//! Onboarding stages and the inputs the gate reads.

use cs_01_session_manager::{Existence, SessionSnapshot};
use serde::{Deserialize, Serialize};

/// Onboarding stage, ordered by progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OnboardingState {
    Unauthenticated,
    NeedsProfile,
    NeedsPet,
    Ready,
}

impl OnboardingState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingState::Unauthenticated => "unauthenticated",
            OnboardingState::NeedsProfile => "needs_profile",
            OnboardingState::NeedsPet => "needs_pet",
            OnboardingState::Ready => "ready",
        }
    }
}

/// Everything the gate decides on. Built fresh for every navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateInput {
    pub has_session: bool,
    pub loading: bool,
    pub has_profile: Existence,
    pub has_pet: Existence,
    pub transitioning: bool,
}

impl GateInput {
    /// Stage for display. Pessimistic: anything not known to be present
    /// counts as missing.
    #[must_use]
    pub fn current_state(&self) -> OnboardingState {
        if !self.has_session {
            OnboardingState::Unauthenticated
        } else if !self.has_profile.is_present() {
            OnboardingState::NeedsProfile
        } else if !self.has_pet.is_present() {
            OnboardingState::NeedsPet
        } else {
            OnboardingState::Ready
        }
    }
}

impl From<&SessionSnapshot> for GateInput {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            has_session: snapshot.has_session(),
            loading: snapshot.loading,
            has_profile: snapshot.has_profile(),
            has_pet: snapshot.has_pet(),
            transitioning: snapshot.transitioning,
        }
    }
}
