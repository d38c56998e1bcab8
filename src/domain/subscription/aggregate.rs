//! Subscription aggregate entity.
//!
//! The Subscription aggregate holds one user's subscription line. A user can
//! accumulate several lines over time but has at most one whose status is
//! active (not CANCELED or EXPIRED).
//!
//! # Design Decisions
//!
//! - **Values, not mutation**: [`Subscription::apply`] returns a new value and
//!   leaves the original untouched, so a rejected command changes nothing
//! - **Versioned**: `version` is the value read from storage and is checked on write
//! - **Status through the table only**: the only direct assignment is FREE at creation

use serde::{Deserialize, Serialize};

use super::{Plan, SubscriptionCommand, SubscriptionError, SubscriptionStatus, TrialDays};
use crate::domain::foundation::{StateMachine, SubscriptionId, Timestamp, UserId};

/// Subscription aggregate.
///
/// # Invariants
///
/// - `id`, `user_id` and `created_at` never change
/// - Status transitions follow [`SubscriptionStatus`] rules
/// - `current_period_start <= current_period_end` when both are set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) user_id: UserId,
    pub(crate) plan: Plan,
    pub(crate) status: SubscriptionStatus,
    pub(crate) trial_ends_at: Option<Timestamp>,
    pub(crate) current_period_start: Option<Timestamp>,
    pub(crate) current_period_end: Option<Timestamp>,
    pub(crate) cancel_at_period_end: bool,
    pub(crate) canceled_at: Option<Timestamp>,
    pub(crate) version: i64,
    pub(crate) created_at: Timestamp,
    pub(crate) updated_at: Timestamp,
}

impl Subscription {
    /// Creates a fresh FREE subscription line for a user.
    pub fn new_free(id: SubscriptionId, user_id: UserId, now: Timestamp) -> Self {
        Self {
            id,
            user_id,
            plan: Plan::Free,
            status: SubscriptionStatus::Free,
            trial_ends_at: None,
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            canceled_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn plan(&self) -> Plan {
        self.plan
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.status
    }

    pub fn trial_ends_at(&self) -> Option<Timestamp> {
        self.trial_ends_at
    }

    pub fn current_period_start(&self) -> Option<Timestamp> {
        self.current_period_start
    }

    pub fn current_period_end(&self) -> Option<Timestamp> {
        self.current_period_end
    }

    pub fn cancel_at_period_end(&self) -> bool {
        self.cancel_at_period_end
    }

    pub fn canceled_at(&self) -> Option<Timestamp> {
        self.canceled_at
    }

    /// Version as last read from (or written to) storage.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Returns true unless this line is CANCELED or EXPIRED.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Applies a command, returning the resulting subscription.
    ///
    /// Every check runs before any field changes; on error `self` is the
    /// unchanged state.
    ///
    /// # Errors
    ///
    /// - `AlreadyInTrial` when starting a trial while TRIALING
    /// - `InvalidTransition` when the status table forbids the move
    /// - `ValidationFailed` when a billing period ends before it starts
    pub fn apply(
        &self,
        command: SubscriptionCommand,
        now: Timestamp,
    ) -> Result<Subscription, SubscriptionError> {
        let mut next = self.clone();

        match command {
            SubscriptionCommand::StartTrial { days } => {
                if self.status == SubscriptionStatus::Trialing {
                    return Err(SubscriptionError::already_in_trial(self.id));
                }
                next.status = self.status.transition_to(SubscriptionStatus::Trialing)?;
                if next.plan == Plan::Free {
                    next.plan = Plan::Individual;
                }
                let ends_at = now.plus_secs(days.as_secs());
                next.trial_ends_at = Some(ends_at);
                next.current_period_start = Some(now);
                next.current_period_end = Some(ends_at);
            }
            SubscriptionCommand::Activate => {
                next.status = self.status.transition_to(SubscriptionStatus::Active)?;
                next.trial_ends_at = None;
            }
            SubscriptionCommand::MarkPastDue => {
                next.status = self.status.transition_to(SubscriptionStatus::PastDue)?;
            }
            SubscriptionCommand::StartGracePeriod => {
                next.status = self.status.transition_to(SubscriptionStatus::GracePeriod)?;
            }
            SubscriptionCommand::Cancel { at_period_end: true } => {
                next.cancel_at_period_end = true;
                next.canceled_at = Some(now);
            }
            SubscriptionCommand::Cancel {
                at_period_end: false,
            } => {
                next.status = self.status.transition_to(SubscriptionStatus::Canceled)?;
                next.cancel_at_period_end = false;
                next.canceled_at = Some(now);
            }
            SubscriptionCommand::Reactivate => {
                next.status = self.status.transition_to(SubscriptionStatus::Active)?;
                next.cancel_at_period_end = false;
                next.canceled_at = None;
            }
            SubscriptionCommand::Expire => {
                next.status = self.status.transition_to(SubscriptionStatus::Expired)?;
                next.canceled_at = Some(now);
            }
            SubscriptionCommand::SetCurrentPeriod { start, end } => {
                if end.is_before(&start) {
                    return Err(SubscriptionError::validation(
                        "current_period_end",
                        "period end must not be before period start",
                    ));
                }
                next.current_period_start = Some(start);
                next.current_period_end = Some(end);
            }
        }

        next.updated_at = now;
        Ok(next)
    }

    /// Starts a trial of `days` days beginning at `now`.
    pub fn start_trial(&self, days: TrialDays, now: Timestamp) -> Result<Self, SubscriptionError> {
        self.apply(SubscriptionCommand::StartTrial { days }, now)
    }

    /// Moves to ACTIVE. Billing sets the period separately.
    pub fn activate(&self, now: Timestamp) -> Result<Self, SubscriptionError> {
        self.apply(SubscriptionCommand::Activate, now)
    }

    pub fn mark_past_due(&self, now: Timestamp) -> Result<Self, SubscriptionError> {
        self.apply(SubscriptionCommand::MarkPastDue, now)
    }

    pub fn start_grace_period(&self, now: Timestamp) -> Result<Self, SubscriptionError> {
        self.apply(SubscriptionCommand::StartGracePeriod, now)
    }

    /// Cancels immediately, or flags cancellation at the period boundary.
    ///
    /// A deferred cancel keeps the current status; enforcing the boundary
    /// is up to billing.
    pub fn cancel(&self, at_period_end: bool, now: Timestamp) -> Result<Self, SubscriptionError> {
        self.apply(SubscriptionCommand::Cancel { at_period_end }, now)
    }

    /// Moves back to ACTIVE and clears any pending cancellation.
    pub fn reactivate(&self, now: Timestamp) -> Result<Self, SubscriptionError> {
        self.apply(SubscriptionCommand::Reactivate, now)
    }

    pub fn expire(&self, now: Timestamp) -> Result<Self, SubscriptionError> {
        self.apply(SubscriptionCommand::Expire, now)
    }

    /// Records the billing period confirmed by the payment provider.
    pub fn set_current_period(
        &self,
        start: Timestamp,
        end: Timestamp,
        now: Timestamp,
    ) -> Result<Self, SubscriptionError> {
        self.apply(SubscriptionCommand::SetCurrentPeriod { start, end }, now)
    }

    pub(crate) fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }
}
