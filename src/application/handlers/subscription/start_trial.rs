//! StartTrialHandler - Command handler for starting trials.

use crate::domain::foundation::UserId;
use crate::domain::subscription::{Subscription, SubscriptionCommand, SubscriptionError, TrialDays};

use super::executor::{LoadTarget, TransitionExecutor};

/// Command to start a trial for a user.
#[derive(Debug, Clone)]
pub struct StartTrialCommand {
    pub user_id: UserId,
    pub trial_days: TrialDays,
}

/// Handler for starting trials.
///
/// Works on the user's active subscription. A user with none gets a new
/// FREE line, which is stored directly in its TRIALING state.
pub struct StartTrialHandler {
    executor: TransitionExecutor,
}

impl StartTrialHandler {
    pub fn new(executor: TransitionExecutor) -> Self {
        Self { executor }
    }

    pub async fn handle(&self, cmd: StartTrialCommand) -> Result<Subscription, SubscriptionError> {
        let transition = self
            .executor
            .execute(
                cmd.user_id,
                LoadTarget::ActiveOrNew,
                SubscriptionCommand::StartTrial {
                    days: cmd.trial_days,
                },
            )
            .await?;
        Ok(transition.after)
    }
}
