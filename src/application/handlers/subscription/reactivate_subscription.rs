//! ReactivateSubscriptionHandler - Command handler for reactivation.

use crate::domain::foundation::UserId;
use crate::domain::subscription::{Subscription, SubscriptionCommand, SubscriptionError};

use super::executor::{LoadTarget, TransitionExecutor};

/// Command to reactivate a user's most recent subscription.
#[derive(Debug, Clone)]
pub struct ReactivateSubscriptionCommand {
    pub user_id: UserId,
}

/// Handler for reactivating subscriptions.
///
/// Acts on the latest line, so an immediately canceled or expired
/// subscription can be brought back.
pub struct ReactivateSubscriptionHandler {
    executor: TransitionExecutor,
}

impl ReactivateSubscriptionHandler {
    pub fn new(executor: TransitionExecutor) -> Self {
        Self { executor }
    }

    pub async fn handle(
        &self,
        cmd: ReactivateSubscriptionCommand,
    ) -> Result<Subscription, SubscriptionError> {
        let transition = self
            .executor
            .execute(cmd.user_id, LoadTarget::Latest, SubscriptionCommand::Reactivate)
            .await?;
        Ok(transition.after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionStore;
    use crate::adapters::metrics::NoopTransitionObserver;
    use crate::application::handlers::subscription::LockingStrategy;
    use crate::domain::subscription::{SubscriptionStatus, TrialDays};
    use std::sync::Arc;

    fn setup() -> (Arc<InMemorySubscriptionStore>, TransitionExecutor) {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let executor = TransitionExecutor::new(
            store.clone(),
            Arc::new(NoopTransitionObserver),
            LockingStrategy::Optimistic,
        );
        (store, executor)
    }

    #[tokio::test]
    async fn reactivate_after_cancel_clears_cancellation() {
        let (store, executor) = setup();
        let user_id = UserId::new();
        executor
            .execute(
                user_id,
                LoadTarget::ActiveOrNew,
                SubscriptionCommand::StartTrial {
                    days: TrialDays::DEFAULT,
                },
            )
            .await
            .unwrap();
        executor
            .execute(
                user_id,
                LoadTarget::Active,
                SubscriptionCommand::Cancel {
                    at_period_end: false,
                },
            )
            .await
            .unwrap();

        let sub = ReactivateSubscriptionHandler::new(executor)
            .handle(ReactivateSubscriptionCommand { user_id })
            .await
            .unwrap();

        assert_eq!(sub.status(), SubscriptionStatus::Active);
        assert!(!sub.cancel_at_period_end());
        assert!(sub.canceled_at().is_none());
        assert_eq!(store.outbox_events()[2].event_type, "reactivated");
    }

    #[tokio::test]
    async fn reactivate_without_subscription_is_not_found() {
        let (_store, executor) = setup();
        let user_id = UserId::new();

        let err = ReactivateSubscriptionHandler::new(executor)
            .handle(ReactivateSubscriptionCommand { user_id })
            .await
            .unwrap_err();

        assert_eq!(err, SubscriptionError::NotFound(user_id));
    }

    #[tokio::test]
    async fn reactivate_recovers_past_due() {
        let (_store, executor) = setup();
        let user_id = UserId::new();
        executor
            .execute(user_id, LoadTarget::ActiveOrNew, SubscriptionCommand::Activate)
            .await
            .unwrap();
        executor
            .execute(user_id, LoadTarget::Active, SubscriptionCommand::MarkPastDue)
            .await
            .unwrap();

        let sub = ReactivateSubscriptionHandler::new(executor)
            .handle(ReactivateSubscriptionCommand { user_id })
            .await
            .unwrap();

        assert_eq!(sub.status(), SubscriptionStatus::Active);
    }
}
