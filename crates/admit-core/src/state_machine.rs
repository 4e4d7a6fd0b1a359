//! Wizard transition table
//!
//! A strictly linear chain of steps with one absorbing terminal state.
//! Forward moves go one step at a time; backward moves may land on any
//! earlier step; `Submitted` is reached only from the review step.
//! Deep-link entry is not a table transition: it is governed by the
//! reachability guard in [`crate::validation::furthest_reachable`].

use crate::error::TransitionError;
use crate::types::{StepId, WizardState};

/// Validates a state transition against the table.
pub fn validate_transition(from: WizardState, to: WizardState) -> Result<(), TransitionError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(TransitionError::IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: WizardState) -> Vec<WizardState> {
    use WizardState::{At, Submitted};
    match from {
        At(step) => {
            let mut targets: Vec<WizardState> = step.predecessors().iter().copied().map(At).collect();
            match step.next() {
                Some(next) => targets.push(At(next)),
                None => targets.push(Submitted),
            }
            targets
        }
        Submitted => vec![],
    }
}

/// Whether `from -> to` moves backwards (retreat or jump-back)
#[must_use]
pub fn is_backward(from: StepId, to: StepId) -> bool {
    to < from
}

fn allowed(from: WizardState, to: WizardState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use WizardState::{At, Submitted};

    #[test]
    fn personal_only_moves_forward() {
        assert_eq!(allowed_transitions(At(StepId::Personal)), vec![At(StepId::Academic)]);
    }

    #[test]
    fn review_goes_back_or_submits() {
        let targets = allowed_transitions(At(StepId::Review));
        assert_eq!(
            targets,
            vec![
                At(StepId::Personal),
                At(StepId::Academic),
                At(StepId::Documents),
                Submitted
            ]
        );
    }

    #[test]
    fn forward_skips_are_illegal() {
        assert!(validate_transition(At(StepId::Personal), At(StepId::Documents)).is_err());
        assert!(validate_transition(At(StepId::Academic), At(StepId::Review)).is_err());
        assert!(validate_transition(At(StepId::Documents), Submitted).is_err());
    }

    #[test]
    fn submitted_is_absorbing() {
        assert!(allowed_transitions(Submitted).is_empty());
        for step in StepId::ALL {
            assert!(validate_transition(Submitted, At(step)).is_err());
        }
    }

    fn any_state() -> impl Strategy<Value = WizardState> {
        prop_oneof![
            Just(At(StepId::Personal)),
            Just(At(StepId::Academic)),
            Just(At(StepId::Documents)),
            Just(At(StepId::Review)),
            Just(Submitted),
        ]
    }

    proptest! {
        #[test]
        fn prop_validation_matches_table(from in any_state(), to in any_state()) {
            let res = validate_transition(from, to);
            let allowed = allowed_transitions(from);
            prop_assert_eq!(res.is_ok(), allowed.contains(&to));
        }

        #[test]
        fn prop_submitted_only_from_review(from in any_state()) {
            let ok = validate_transition(from, Submitted).is_ok();
            prop_assert_eq!(ok, from == At(StepId::Review));
        }
    }
}
