//! Subscription domain events.
//!
//! One event is derived from every committed subscription mutation and
//! stored in the outbox in the same transaction. Payload keys are camelCase
//! and enum values SCREAMING_SNAKE, matching what downstream consumers read
//! from the `subscription.events` topic.

use serde::Serialize;

use super::{Plan, Subscription, SubscriptionCommand, SubscriptionStatus};
use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};

/// Topic every subscription event is published to.
pub const SUBSCRIPTION_EVENTS_TOPIC: &str = "subscription.events";

/// Aggregate type recorded on outbox rows.
pub const SUBSCRIPTION_AGGREGATE_TYPE: &str = "subscription";

/// Events emitted during the subscription lifecycle.
///
/// Serialized untagged: the event type travels in the outbox row, the
/// payload only carries the fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SubscriptionEvent {
    /// FREE or EXPIRED → TRIALING
    #[serde(rename_all = "camelCase")]
    TrialStarted {
        subscription_id: SubscriptionId,
        user_id: UserId,
        plan: Plan,
        status: SubscriptionStatus,
        trial_ends_at: Option<Timestamp>,
    },

    /// → ACTIVE after payment
    #[serde(rename_all = "camelCase")]
    Activated {
        subscription_id: SubscriptionId,
        user_id: UserId,
        plan: Plan,
        status: SubscriptionStatus,
    },

    /// Immediate or deferred cancellation.
    #[serde(rename_all = "camelCase")]
    Canceled {
        subscription_id: SubscriptionId,
        user_id: UserId,
        cancel_at_period_end: bool,
        canceled_at: Option<Timestamp>,
    },

    #[serde(rename_all = "camelCase")]
    PastDue {
        subscription_id: SubscriptionId,
        user_id: UserId,
        plan: Plan,
    },

    #[serde(rename_all = "camelCase")]
    GraceStarted {
        subscription_id: SubscriptionId,
        user_id: UserId,
        plan: Plan,
    },

    #[serde(rename_all = "camelCase")]
    Reactivated {
        subscription_id: SubscriptionId,
        user_id: UserId,
        plan: Plan,
    },

    #[serde(rename_all = "camelCase")]
    Expired {
        subscription_id: SubscriptionId,
        user_id: UserId,
        plan: Plan,
        canceled_at: Option<Timestamp>,
    },

    /// Billing confirmed a new period. No status change.
    #[serde(rename_all = "camelCase")]
    PeriodUpdated {
        subscription_id: SubscriptionId,
        user_id: UserId,
        current_period_start: Option<Timestamp>,
        current_period_end: Option<Timestamp>,
    },
}

impl SubscriptionEvent {
    /// Builds the event describing `command` from the post-mutation snapshot.
    pub fn from_command(command: &SubscriptionCommand, after: &Subscription) -> Self {
        let subscription_id = after.id();
        let user_id = after.user_id();
        match command {
            SubscriptionCommand::StartTrial { .. } => SubscriptionEvent::TrialStarted {
                subscription_id,
                user_id,
                plan: after.plan(),
                status: after.status(),
                trial_ends_at: after.trial_ends_at(),
            },
            SubscriptionCommand::Activate => SubscriptionEvent::Activated {
                subscription_id,
                user_id,
                plan: after.plan(),
                status: after.status(),
            },
            SubscriptionCommand::Cancel { .. } => SubscriptionEvent::Canceled {
                subscription_id,
                user_id,
                cancel_at_period_end: after.cancel_at_period_end(),
                canceled_at: after.canceled_at(),
            },
            SubscriptionCommand::MarkPastDue => SubscriptionEvent::PastDue {
                subscription_id,
                user_id,
                plan: after.plan(),
            },
            SubscriptionCommand::StartGracePeriod => SubscriptionEvent::GraceStarted {
                subscription_id,
                user_id,
                plan: after.plan(),
            },
            SubscriptionCommand::Reactivate => SubscriptionEvent::Reactivated {
                subscription_id,
                user_id,
                plan: after.plan(),
            },
            SubscriptionCommand::Expire => SubscriptionEvent::Expired {
                subscription_id,
                user_id,
                plan: after.plan(),
                canceled_at: after.canceled_at(),
            },
            SubscriptionCommand::SetCurrentPeriod { .. } => SubscriptionEvent::PeriodUpdated {
                subscription_id,
                user_id,
                current_period_start: after.current_period_start(),
                current_period_end: after.current_period_end(),
            },
        }
    }

    /// Event type stored on the outbox row and sent as a header.
    pub fn event_type(&self) -> &'static str {
        match self {
            SubscriptionEvent::TrialStarted { .. } => "trial_started",
            SubscriptionEvent::Activated { .. } => "activated",
            SubscriptionEvent::Canceled { .. } => "canceled",
            SubscriptionEvent::PastDue { .. } => "past_due",
            SubscriptionEvent::GraceStarted { .. } => "grace_started",
            SubscriptionEvent::Reactivated { .. } => "reactivated",
            SubscriptionEvent::Expired { .. } => "expired",
            SubscriptionEvent::PeriodUpdated { .. } => "period_updated",
        }
    }

    pub fn subscription_id(&self) -> SubscriptionId {
        match self {
            SubscriptionEvent::TrialStarted { subscription_id, .. }
            | SubscriptionEvent::Activated { subscription_id, .. }
            | SubscriptionEvent::Canceled { subscription_id, .. }
            | SubscriptionEvent::PastDue { subscription_id, .. }
            | SubscriptionEvent::GraceStarted { subscription_id, .. }
            | SubscriptionEvent::Reactivated { subscription_id, .. }
            | SubscriptionEvent::Expired { subscription_id, .. }
            | SubscriptionEvent::PeriodUpdated { subscription_id, .. } => *subscription_id,
        }
    }
}
