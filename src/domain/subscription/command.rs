//! Commands accepted by the subscription aggregate.

use super::TrialDays;
use crate::domain::foundation::Timestamp;

/// A requested change to a subscription.
///
/// Applied with [`Subscription::apply`](super::Subscription::apply).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionCommand {
    StartTrial { days: TrialDays },
    Activate,
    MarkPastDue,
    StartGracePeriod,
    Cancel { at_period_end: bool },
    Reactivate,
    Expire,
    SetCurrentPeriod { start: Timestamp, end: Timestamp },
}

impl SubscriptionCommand {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            SubscriptionCommand::StartTrial { .. } => "start_trial",
            SubscriptionCommand::Activate => "activate",
            SubscriptionCommand::MarkPastDue => "mark_past_due",
            SubscriptionCommand::StartGracePeriod => "start_grace_period",
            SubscriptionCommand::Cancel { .. } => "cancel",
            SubscriptionCommand::Reactivate => "reactivate",
            SubscriptionCommand::Expire => "expire",
            SubscriptionCommand::SetCurrentPeriod { .. } => "set_current_period",
        }
    }
}
