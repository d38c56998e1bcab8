//! SubscriptionService - Entry point for the request layer.
//!
//! Wraps the subscription handlers and returns [`SubscriptionView`]s. Each
//! mutating call is one transaction: aggregate write plus one outbox row.

use std::sync::Arc;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::subscription::{SubscriptionError, SubscriptionView, TrialDays};
use crate::ports::{SubscriptionStore, TransitionObserver};

use super::handlers::subscription::{
    BillingEvent, CancelSubscriptionCommand, CancelSubscriptionHandler, GetSubscriptionHandler,
    GetSubscriptionQuery, HandleBillingEventCommand, HandleBillingEventHandler, LockingStrategy,
    ReactivateSubscriptionCommand, ReactivateSubscriptionHandler, StartTrialCommand,
    StartTrialHandler, TransitionExecutor,
};

/// Subscription use cases.
///
/// # Example
///
/// ```ignore
/// let service = SubscriptionService::new(store, Arc::new(TracingTransitionObserver))
///     .with_locking(LockingStrategy::Pessimistic);
///
/// let view = service.start_trial(user_id, TrialDays::try_new(30)?).await?;
/// assert_eq!(view.status, SubscriptionStatus::Trialing);
/// ```
pub struct SubscriptionService {
    store: Arc<dyn SubscriptionStore>,
    observer: Arc<dyn TransitionObserver>,
    locking: LockingStrategy,
    default_trial_days: TrialDays,
    get: GetSubscriptionHandler,
    start_trial: StartTrialHandler,
    cancel: CancelSubscriptionHandler,
    reactivate: ReactivateSubscriptionHandler,
    billing: HandleBillingEventHandler,
}

impl SubscriptionService {
    /// Creates a service with optimistic locking and a 14 day default trial.
    pub fn new(store: Arc<dyn SubscriptionStore>, observer: Arc<dyn TransitionObserver>) -> Self {
        Self::build(store, observer, LockingStrategy::default(), TrialDays::default())
    }

    pub fn with_locking(self, locking: LockingStrategy) -> Self {
        Self::build(self.store, self.observer, locking, self.default_trial_days)
    }

    pub fn with_default_trial_days(mut self, days: TrialDays) -> Self {
        self.default_trial_days = days;
        self
    }

    fn build(
        store: Arc<dyn SubscriptionStore>,
        observer: Arc<dyn TransitionObserver>,
        locking: LockingStrategy,
        default_trial_days: TrialDays,
    ) -> Self {
        let executor = TransitionExecutor::new(store.clone(), observer.clone(), locking);
        Self {
            get: GetSubscriptionHandler::new(store.clone()),
            start_trial: StartTrialHandler::new(executor.clone()),
            cancel: CancelSubscriptionHandler::new(executor.clone()),
            reactivate: ReactivateSubscriptionHandler::new(executor.clone()),
            billing: HandleBillingEventHandler::new(executor),
            store,
            observer,
            locking,
            default_trial_days,
        }
    }

    pub fn locking(&self) -> LockingStrategy {
        self.locking
    }

    /// Trial length used when the caller does not pick one.
    pub fn default_trial_days(&self) -> TrialDays {
        self.default_trial_days
    }

    /// The user's most recently created subscription.
    pub async fn get_subscription_for_user(
        &self,
        user_id: UserId,
    ) -> Result<SubscriptionView, SubscriptionError> {
        let sub = self.get.handle(GetSubscriptionQuery { user_id }).await?;
        Ok(sub.into())
    }

    /// Starts a trial, creating a FREE line first if the user has no active one.
    pub async fn start_trial(
        &self,
        user_id: UserId,
        trial_days: TrialDays,
    ) -> Result<SubscriptionView, SubscriptionError> {
        let sub = self
            .start_trial
            .handle(StartTrialCommand {
                user_id,
                trial_days,
            })
            .await?;
        Ok(sub.into())
    }

    pub async fn cancel(
        &self,
        user_id: UserId,
        at_period_end: bool,
    ) -> Result<SubscriptionView, SubscriptionError> {
        let sub = self
            .cancel
            .handle(CancelSubscriptionCommand {
                user_id,
                at_period_end,
            })
            .await?;
        Ok(sub.into())
    }

    pub async fn reactivate(&self, user_id: UserId) -> Result<SubscriptionView, SubscriptionError> {
        let sub = self
            .reactivate
            .handle(ReactivateSubscriptionCommand { user_id })
            .await?;
        Ok(sub.into())
    }

    // === Billing-driven ===

    pub async fn activate(&self, user_id: UserId) -> Result<SubscriptionView, SubscriptionError> {
        self.on_billing(user_id, BillingEvent::PaymentSucceeded).await
    }

    pub async fn mark_past_due(
        &self,
        user_id: UserId,
    ) -> Result<SubscriptionView, SubscriptionError> {
        self.on_billing(user_id, BillingEvent::PaymentFailed).await
    }

    pub async fn start_grace_period(
        &self,
        user_id: UserId,
    ) -> Result<SubscriptionView, SubscriptionError> {
        self.on_billing(user_id, BillingEvent::GracePeriodStarted).await
    }

    pub async fn expire(&self, user_id: UserId) -> Result<SubscriptionView, SubscriptionError> {
        self.on_billing(user_id, BillingEvent::Expired).await
    }

    /// Records the period the payment provider confirmed.
    pub async fn update_billing_period(
        &self,
        user_id: UserId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<SubscriptionView, SubscriptionError> {
        self.on_billing(user_id, BillingEvent::PeriodConfirmed { start, end })
            .await
    }

    async fn on_billing(
        &self,
        user_id: UserId,
        event: BillingEvent,
    ) -> Result<SubscriptionView, SubscriptionError> {
        let sub = self
            .billing
            .handle(HandleBillingEventCommand { user_id, event })
            .await?;
        Ok(sub.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionStore;
    use crate::adapters::metrics::InMemoryTransitionCounter;
    use crate::domain::subscription::{ErrorKind, SubscriptionStatus};

    fn service() -> (
        Arc<InMemorySubscriptionStore>,
        Arc<InMemoryTransitionCounter>,
        SubscriptionService,
    ) {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let counter = Arc::new(InMemoryTransitionCounter::new());
        let service = SubscriptionService::new(store.clone(), counter.clone());
        (store, counter, service)
    }

    #[tokio::test]
    async fn defaults() {
        let (_, _, service) = service();
        assert_eq!(service.locking(), LockingStrategy::Optimistic);
        assert_eq!(service.default_trial_days().value(), 14);

        let service = service
            .with_locking(LockingStrategy::Pessimistic)
            .with_default_trial_days(TrialDays::try_new(30).unwrap());
        assert_eq!(service.locking(), LockingStrategy::Pessimistic);
        assert_eq!(service.default_trial_days().value(), 30);
    }

    #[tokio::test]
    async fn get_returns_view_of_latest_line() {
        let (_, _, service) = service();
        let user_id = UserId::new();
        let started = service
            .start_trial(user_id, TrialDays::DEFAULT)
            .await
            .unwrap();

        let view = service.get_subscription_for_user(user_id).await.unwrap();

        assert_eq!(view, started);
        assert_eq!(view.status, SubscriptionStatus::Trialing);
    }

    #[tokio::test]
    async fn get_unknown_user_maps_to_not_found_kind() {
        let (_, _, service) = service();

        let err = service
            .get_subscription_for_user(UserId::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn billing_lifecycle_emits_one_event_per_call() {
        let (store, counter, service) = service();
        let user_id = UserId::new();

        service.start_trial(user_id, TrialDays::DEFAULT).await.unwrap();
        service.activate(user_id).await.unwrap();
        let start = Timestamp::now();
        let period = service
            .update_billing_period(user_id, start, start.plus_days(30))
            .await
            .unwrap();
        service.mark_past_due(user_id).await.unwrap();
        service.start_grace_period(user_id).await.unwrap();
        let expired = service.expire(user_id).await.unwrap();

        assert_eq!(period.current_period_start, Some(start));
        assert_eq!(expired.status, SubscriptionStatus::Expired);
        assert!(expired.canceled_at.is_some());

        let types: Vec<String> = store
            .outbox_events()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(
            types,
            vec![
                "trial_started",
                "activated",
                "period_updated",
                "past_due",
                "grace_started",
                "expired"
            ]
        );
        assert_eq!(counter.total(), 6);
        assert_eq!(
            counter.count(SubscriptionStatus::GracePeriod, SubscriptionStatus::Expired),
            1
        );
    }

    #[tokio::test]
    async fn billing_period_rejects_end_before_start() {
        let (store, _, service) = service();
        let user_id = UserId::new();
        service.start_trial(user_id, TrialDays::DEFAULT).await.unwrap();

        let start = Timestamp::now();
        let err = service
            .update_billing_period(user_id, start, start.plus_days(-1))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(store.outbox_events().len(), 1);
    }

    #[tokio::test]
    async fn invalid_transition_maps_to_conflict() {
        let (_, _, service) = service();
        let user_id = UserId::new();
        service.start_trial(user_id, TrialDays::DEFAULT).await.unwrap();

        let err = service.mark_past_due(user_id).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!err.is_retryable());
    }
}
