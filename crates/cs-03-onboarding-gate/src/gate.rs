//! Route admissibility.
//!
//! Rules, in order:
//!
//! 1. Transition lock set: allow the requested route.
//! 2. Session still loading: wait.
//! 3. Walk the route's requirements lowest first (session, profile, pet).
//!    A confirmed miss redirects to that requirement's canonical screen.
//!    An unknown flag stops the walk and allows the route.
//! 4. A setup route whose stage is already done forwards to the canonical
//!    screen of the current stage.
//!
//! Every redirect target is itself allowed for the same input, so a
//! navigation settles after at most one redirect.

use cs_01_session_manager::Existence;
use serde::{Deserialize, Serialize};

use crate::domain::{GateInput, OnboardingState, Route};

/// What the navigator should do with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateDecision {
    Allow,
    Redirect(Route),
    /// Session state not resolved yet; render nothing route-specific.
    Wait,
}

/// Decide whether `route` may render for `input`.
#[must_use]
pub fn evaluate(input: &GateInput, route: Route) -> GateDecision {
    if input.transitioning {
        return GateDecision::Allow;
    }
    if input.loading {
        return GateDecision::Wait;
    }

    let required = route.min_state();
    if required > OnboardingState::Unauthenticated && !input.has_session {
        return GateDecision::Redirect(Route::SignIn);
    }
    if required > OnboardingState::NeedsProfile {
        match input.has_profile {
            Existence::Absent => return GateDecision::Redirect(Route::ProfileSetup),
            Existence::Unknown => return GateDecision::Allow,
            Existence::Present => {}
        }
    }
    if required > OnboardingState::NeedsPet {
        match input.has_pet {
            Existence::Absent => return GateDecision::Redirect(Route::PetSetup),
            Existence::Unknown => return GateDecision::Allow,
            Existence::Present => {}
        }
    }

    if let Some(stage) = route.completes() {
        if stage_done(input, stage) {
            let next = Route::canonical(input.current_state());
            if next != route {
                return GateDecision::Redirect(next);
            }
        }
    }
    GateDecision::Allow
}

fn stage_done(input: &GateInput, stage: OnboardingState) -> bool {
    match stage {
        OnboardingState::Unauthenticated => input.has_session,
        OnboardingState::NeedsProfile => input.has_profile.is_present(),
        OnboardingState::NeedsPet => input.has_pet.is_present(),
        OnboardingState::Ready => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn signed_in(has_profile: Existence, has_pet: Existence) -> GateInput {
        GateInput {
            has_session: true,
            loading: false,
            has_profile,
            has_pet,
            transitioning: false,
        }
    }

    #[test]
    fn test_no_profile_no_pet_on_ready_route_goes_to_profile_setup() {
        let input = signed_in(Existence::Absent, Existence::Absent);
        assert_eq!(
            evaluate(&input, Route::Shop),
            GateDecision::Redirect(Route::ProfileSetup)
        );
    }

    #[test]
    fn test_profile_without_pet_on_root_goes_to_pet_setup() {
        let input = signed_in(Existence::Present, Existence::Absent);
        assert_eq!(
            evaluate(&input, Route::Home),
            GateDecision::Redirect(Route::PetSetup)
        );
    }

    #[test]
    fn test_transition_lock_bypasses_redirects() {
        // Pet just created, refresh not resolved yet
        let input = GateInput {
            transitioning: true,
            ..signed_in(Existence::Present, Existence::Absent)
        };
        assert_eq!(evaluate(&input, Route::Home), GateDecision::Allow);
    }

    #[test]
    fn test_loading_waits() {
        let input = GateInput {
            loading: true,
            ..signed_in(Existence::Unknown, Existence::Unknown)
        };
        assert_eq!(evaluate(&input, Route::Home), GateDecision::Wait);
    }

    #[test]
    fn test_signed_out_goes_to_sign_in() {
        let input = GateInput {
            has_session: false,
            ..signed_in(Existence::Unknown, Existence::Unknown)
        };
        assert_eq!(
            evaluate(&input, Route::PetSetup),
            GateDecision::Redirect(Route::SignIn)
        );
        assert_eq!(evaluate(&input, Route::SignIn), GateDecision::Allow);
    }

    #[test]
    fn test_unknown_flag_never_redirects() {
        let input = signed_in(Existence::Unknown, Existence::Absent);
        assert_eq!(evaluate(&input, Route::Home), GateDecision::Allow);

        let input = signed_in(Existence::Present, Existence::Unknown);
        assert_eq!(evaluate(&input, Route::Coaching), GateDecision::Allow);
    }

    #[test]
    fn test_finished_setup_routes_forward() {
        let ready = signed_in(Existence::Present, Existence::Present);
        assert_eq!(
            evaluate(&ready, Route::PetSetup),
            GateDecision::Redirect(Route::Home)
        );
        assert_eq!(
            evaluate(&ready, Route::SignIn),
            GateDecision::Redirect(Route::Home)
        );

        let needs_pet = signed_in(Existence::Present, Existence::Absent);
        assert_eq!(
            evaluate(&needs_pet, Route::ProfileSetup),
            GateDecision::Redirect(Route::PetSetup)
        );
    }

    #[test]
    fn test_settings_needs_only_a_profile() {
        let input = signed_in(Existence::Present, Existence::Absent);
        assert_eq!(evaluate(&input, Route::Settings), GateDecision::Allow);
    }

    fn existence() -> impl Strategy<Value = Existence> {
        prop_oneof![
            Just(Existence::Present),
            Just(Existence::Absent),
            Just(Existence::Unknown),
        ]
    }

    proptest! {
        #[test]
        fn prop_redirects_settle_in_one_step(
            has_session in any::<bool>(),
            has_profile in existence(),
            has_pet in existence(),
            index in 0usize..Route::ALL.len(),
        ) {
            let input = GateInput {
                has_session,
                loading: false,
                has_profile,
                has_pet,
                transitioning: false,
            };
            let route = Route::ALL[index];
            if let GateDecision::Redirect(target) = evaluate(&input, route) {
                prop_assert_ne!(target, route);
                prop_assert_eq!(evaluate(&input, target), GateDecision::Allow);
            }
        }
    }
}
