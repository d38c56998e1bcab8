//! CancelSubscriptionHandler - Command handler for cancellations.

use crate::domain::foundation::UserId;
use crate::domain::subscription::{Subscription, SubscriptionCommand, SubscriptionError};

use super::executor::{LoadTarget, TransitionExecutor};

/// Command to cancel a user's active subscription.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub user_id: UserId,
    /// Keep the current status and only flag the cancellation.
    pub at_period_end: bool,
}

/// Handler for cancelling subscriptions.
pub struct CancelSubscriptionHandler {
    executor: TransitionExecutor,
}

impl CancelSubscriptionHandler {
    pub fn new(executor: TransitionExecutor) -> Self {
        Self { executor }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<Subscription, SubscriptionError> {
        let transition = self
            .executor
            .execute(
                cmd.user_id,
                LoadTarget::Active,
                SubscriptionCommand::Cancel {
                    at_period_end: cmd.at_period_end,
                },
            )
            .await?;
        Ok(transition.after)
    }
}
