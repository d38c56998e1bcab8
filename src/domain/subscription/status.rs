//! Subscription status state machine.
//!
//! Defines all subscription states and the legal transitions between them.
//! Every status change in the aggregate goes through this table.

use crate::domain::foundation::{StateMachine, TransitionRejected, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// Initial state of a newly created subscription line.
    Free,

    /// Trial running until `trial_ends_at`.
    Trialing,

    /// Paid and in good standing.
    Active,

    /// A renewal payment failed; billing is retrying.
    PastDue,

    /// Retries exhausted but access is kept for a grace window.
    GracePeriod,

    /// Canceled by the user or billing. Can be reactivated.
    Canceled,

    /// Ended. The user must re-subscribe or start a new trial.
    Expired,
}

impl SubscriptionStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [SubscriptionStatus; 7] = [
        SubscriptionStatus::Free,
        SubscriptionStatus::Trialing,
        SubscriptionStatus::Active,
        SubscriptionStatus::PastDue,
        SubscriptionStatus::GracePeriod,
        SubscriptionStatus::Canceled,
        SubscriptionStatus::Expired,
    ];

    /// Returns true unless the subscription line has ended.
    ///
    /// A user has at most one active subscription at a time.
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            SubscriptionStatus::Canceled | SubscriptionStatus::Expired
        )
    }

    /// Stable storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Free => "FREE",
            SubscriptionStatus::Trialing => "TRIALING",
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::PastDue => "PAST_DUE",
            SubscriptionStatus::GracePeriod => "GRACE_PERIOD",
            SubscriptionStatus::Canceled => "CANCELED",
            SubscriptionStatus::Expired => "EXPIRED",
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        self == target
            || matches!(
                (self, target),
                // From FREE
                (Free, Trialing)
                    | (Free, Active)
                // From TRIALING
                    | (Trialing, Active)
                    | (Trialing, Canceled)
                    | (Trialing, Expired)
                // From ACTIVE
                    | (Active, PastDue)
                    | (Active, Canceled)
                    | (Active, Expired)
                    | (Active, GracePeriod)
                // From PAST_DUE
                    | (PastDue, Active)
                    | (PastDue, GracePeriod)
                    | (PastDue, Canceled)
                    | (PastDue, Expired)
                // From GRACE_PERIOD
                    | (GracePeriod, Active)
                    | (GracePeriod, Canceled)
                    | (GracePeriod, Expired)
                // From CANCELED
                    | (Canceled, Active) // Reactivation
                // From EXPIRED
                    | (Expired, Active)
                    | (Expired, Trialing) // Re-subscribe
            )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Free => vec![Trialing, Active],
            Trialing => vec![Active, Canceled, Expired],
            Active => vec![PastDue, Canceled, Expired, GracePeriod],
            PastDue => vec![Active, GracePeriod, Canceled, Expired],
            GracePeriod => vec![Active, Canceled, Expired],
            Canceled => vec![Active],
            Expired => vec![Active, Trialing],
        }
    }
}

/// Returns true if moving from `from` to `to` is legal.
pub fn can_transition(from: SubscriptionStatus, to: SubscriptionStatus) -> bool {
    from.can_transition_to(&to)
}

/// Validates a transition without performing it.
pub fn validate_transition(
    from: SubscriptionStatus,
    to: SubscriptionStatus,
) -> Result<(), TransitionRejected<SubscriptionStatus>> {
    from.transition_to(to).map(|_| ())
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubscriptionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format("status", format!("unknown status '{}'", s))
            })
    }
}
