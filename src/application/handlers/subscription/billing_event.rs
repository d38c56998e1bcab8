//! HandleBillingEventHandler - Command handler for billing-driven changes.
//!
//! The payment side reports outcomes; each maps to one aggregate command on
//! the user's active subscription.

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::subscription::{Subscription, SubscriptionCommand, SubscriptionError};

use super::executor::{LoadTarget, TransitionExecutor};

/// Outcome reported by billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingEvent {
    /// First successful charge, or recovery from delinquency.
    PaymentSucceeded,
    /// A renewal charge failed.
    PaymentFailed,
    /// Retries are exhausted; access continues for a grace window.
    GracePeriodStarted,
    /// The subscription has run out.
    Expired,
    /// The provider confirmed the current billing period.
    PeriodConfirmed { start: Timestamp, end: Timestamp },
}

impl BillingEvent {
    fn command(self) -> SubscriptionCommand {
        match self {
            BillingEvent::PaymentSucceeded => SubscriptionCommand::Activate,
            BillingEvent::PaymentFailed => SubscriptionCommand::MarkPastDue,
            BillingEvent::GracePeriodStarted => SubscriptionCommand::StartGracePeriod,
            BillingEvent::Expired => SubscriptionCommand::Expire,
            BillingEvent::PeriodConfirmed { start, end } => {
                SubscriptionCommand::SetCurrentPeriod { start, end }
            }
        }
    }
}

/// Command carrying one billing outcome for a user.
#[derive(Debug, Clone)]
pub struct HandleBillingEventCommand {
    pub user_id: UserId,
    pub event: BillingEvent,
}

/// Handler for billing outcomes.
pub struct HandleBillingEventHandler {
    executor: TransitionExecutor,
}

impl HandleBillingEventHandler {
    pub fn new(executor: TransitionExecutor) -> Self {
        Self { executor }
    }

    pub async fn handle(
        &self,
        cmd: HandleBillingEventCommand,
    ) -> Result<Subscription, SubscriptionError> {
        let transition = self
            .executor
            .execute(cmd.user_id, LoadTarget::Active, cmd.event.command())
            .await?;
        Ok(transition.after)
    }
}
