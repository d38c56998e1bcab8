//! State machine trait for status enums.
//!
//! Provides a consistent interface for validating and performing state
//! transitions of lifecycle statuses.

use std::fmt;

/// A transition the state machine refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRejected<S> {
    pub from: S,
    pub to: S,
}

impl<S: fmt::Debug> fmt::Display for TransitionRejected<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot transition from {:?} to {:?}", self.from, self.to)
    }
}

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free. Staying in the current state is always
/// permitted and never needs to appear in the table.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for SubscriptionStatus {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         self == target
///             || matches!(
///                 (self, target),
///                 (Free, Trialing) | (Free, Active) | // ... etc
///             )
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Free => vec![Trialing, Active],
///             // ... etc
///         }
///     }
/// }
///
/// // Usage:
/// let next = current.transition_to(SubscriptionStatus::Active)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state, excluding self.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    ///
    /// This is the preferred way to change state, as it ensures
    /// the transition is valid according to the state machine rules.
    fn transition_to(&self, target: Self) -> Result<Self, TransitionRejected<Self>> {
        if *self == target || self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(TransitionRejected {
                from: *self,
                to: target,
            })
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestStatus {
        Draft,
        Active,
        Archived,
    }

    impl StateMachine for TestStatus {
        fn can_transition_to(&self, target: &Self) -> bool {
            use TestStatus::*;
            matches!((self, target), (Draft, Active) | (Active, Archived))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use TestStatus::*;
            match self {
                Draft => vec![Active],
                Active => vec![Archived],
                Archived => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        assert_eq!(
            TestStatus::Draft.transition_to(TestStatus::Active),
            Ok(TestStatus::Active)
        );
    }

    #[test]
    fn transition_to_reports_both_ends_when_rejected() {
        let err = TestStatus::Draft
            .transition_to(TestStatus::Archived)
            .unwrap_err();
        assert_eq!(err.from, TestStatus::Draft);
        assert_eq!(err.to, TestStatus::Archived);
        assert_eq!(err.to_string(), "Cannot transition from Draft to Archived");
    }

    #[test]
    fn transition_to_same_state_is_always_allowed() {
        assert_eq!(
            TestStatus::Archived.transition_to(TestStatus::Archived),
            Ok(TestStatus::Archived)
        );
    }

    #[test]
    fn is_terminal_only_for_states_without_exits() {
        assert!(TestStatus::Archived.is_terminal());
        assert!(!TestStatus::Draft.is_terminal());
    }
}
