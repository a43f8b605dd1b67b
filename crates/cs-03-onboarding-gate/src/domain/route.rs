//! Route table.
//!
//! Each route declares the least onboarding progress it needs. Setup
//! routes are also left behind once their stage is done.

use serde::{Deserialize, Serialize};

use super::state::OnboardingState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Route {
    SignIn,
    ProfileSetup,
    PetSetup,
    Home,
    Shop,
    Minigames,
    Coaching,
    Settings,
}

impl Route {
    pub const ALL: [Route; 8] = [
        Route::SignIn,
        Route::ProfileSetup,
        Route::PetSetup,
        Route::Home,
        Route::Shop,
        Route::Minigames,
        Route::Coaching,
        Route::Settings,
    ];

    /// Minimum stage the route needs. `NeedsProfile` means "signed in",
    /// `NeedsPet` means "has a profile".
    #[must_use]
    pub fn min_state(&self) -> OnboardingState {
        match self {
            Route::SignIn => OnboardingState::Unauthenticated,
            Route::ProfileSetup => OnboardingState::NeedsProfile,
            Route::PetSetup | Route::Settings => OnboardingState::NeedsPet,
            Route::Home | Route::Shop | Route::Minigames | Route::Coaching => {
                OnboardingState::Ready
            }
        }
    }

    /// The stage this route completes, for setup routes.
    #[must_use]
    pub fn completes(&self) -> Option<OnboardingState> {
        match self {
            Route::SignIn => Some(OnboardingState::Unauthenticated),
            Route::ProfileSetup => Some(OnboardingState::NeedsProfile),
            Route::PetSetup => Some(OnboardingState::NeedsPet),
            _ => None,
        }
    }

    /// Canonical screen for a stage.
    #[must_use]
    pub fn canonical(state: OnboardingState) -> Route {
        match state {
            OnboardingState::Unauthenticated => Route::SignIn,
            OnboardingState::NeedsProfile => Route::ProfileSetup,
            OnboardingState::NeedsPet => Route::PetSetup,
            OnboardingState::Ready => Route::Home,
        }
    }

    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            Route::SignIn => "/sign-in",
            Route::ProfileSetup => "/setup/profile",
            Route::PetSetup => "/setup/pet",
            Route::Home => "/",
            Route::Shop => "/shop",
            Route::Minigames => "/minigames",
            Route::Coaching => "/coaching",
            Route::Settings => "/settings",
        }
    }

    #[must_use]
    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = match path.trim_end_matches('/') {
            "" => "/",
            other => other,
        };
        Route::ALL.into_iter().find(|r| r.path() == trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_round_trip() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/shop/"), Some(Route::Shop));
        assert_eq!(Route::from_path("/nowhere"), None);
    }

    #[test]
    fn test_canonical_screens_are_setup_routes() {
        for state in [
            OnboardingState::Unauthenticated,
            OnboardingState::NeedsProfile,
            OnboardingState::NeedsPet,
        ] {
            assert_eq!(Route::canonical(state).completes(), Some(state));
        }
        assert_eq!(Route::canonical(OnboardingState::Ready), Route::Home);
    }
}
