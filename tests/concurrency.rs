//! Concurrency tests for subscription writes.
//!
//! A gated store wrapper holds each transaction at `update()` so two use
//! cases are guaranteed to read the same version before either commits.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

use subscription_service::adapters::{InMemorySubscriptionStore, NoopTransitionObserver};
use subscription_service::application::{LockingStrategy, SubscriptionService};
use subscription_service::domain::foundation::{DomainError, SubscriptionId, Timestamp, UserId};
use subscription_service::domain::outbox::OutboxEvent;
use subscription_service::domain::subscription::{
    Subscription, SubscriptionCommand, SubscriptionError, SubscriptionStatus,
    SubscriptionTransition, TrialDays,
};
use subscription_service::ports::{OutboxStore, SubscriptionStore, SubscriptionTransaction};

// =============================================================================
// Test Infrastructure
// =============================================================================

#[derive(Clone)]
enum Gate {
    Open,
    /// Every transaction waits here until all parties arrive.
    Barrier(Arc<Barrier>),
    /// Every transaction pauses before writing.
    Delay(Duration),
}

struct GatedStore {
    inner: Arc<InMemorySubscriptionStore>,
    gate: Mutex<Gate>,
}

impl GatedStore {
    fn new(inner: Arc<InMemorySubscriptionStore>) -> Self {
        Self {
            inner,
            gate: Mutex::new(Gate::Open),
        }
    }

    fn set_gate(&self, gate: Gate) {
        *self.gate.lock().unwrap() = gate;
    }
}

#[async_trait]
impl SubscriptionStore for GatedStore {
    async fn begin(&self) -> Result<Box<dyn SubscriptionTransaction>, DomainError> {
        let inner = self.inner.begin().await?;
        let gate = self.gate.lock().unwrap().clone();
        Ok(Box::new(GatedTransaction { inner, gate }))
    }

    async fn find_latest_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        self.inner.find_latest_by_user(user_id).await
    }
}

struct GatedTransaction {
    inner: Box<dyn SubscriptionTransaction>,
    gate: Gate,
}

#[async_trait]
impl SubscriptionTransaction for GatedTransaction {
    async fn find_active_by_user(
        &mut self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        self.inner.find_active_by_user(user_id).await
    }

    async fn find_latest_by_user(
        &mut self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        self.inner.find_latest_by_user(user_id).await
    }

    async fn lock_by_id(
        &mut self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        self.inner.lock_by_id(id).await
    }

    async fn insert(&mut self, subscription: &Subscription) -> Result<(), DomainError> {
        self.inner.insert(subscription).await
    }

    async fn update(&mut self, subscription: &Subscription) -> Result<i64, DomainError> {
        match &self.gate {
            Gate::Open => {}
            Gate::Barrier(barrier) => {
                barrier.wait().await;
            }
            Gate::Delay(delay) => tokio::time::sleep(*delay).await,
        }
        self.inner.update(subscription).await
    }

    async fn append_outbox(&mut self, event: &OutboxEvent) -> Result<(), DomainError> {
        self.inner.append_outbox(event).await
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.inner.commit().await
    }
}

/// An ACTIVE-path subscription with a deferred cancel pending.
async fn setup(
    locking: LockingStrategy,
) -> (Arc<InMemorySubscriptionStore>, Arc<GatedStore>, SubscriptionService, UserId) {
    let inner = Arc::new(InMemorySubscriptionStore::new());
    let gated = Arc::new(GatedStore::new(inner.clone()));
    let service = SubscriptionService::new(gated.clone(), Arc::new(NoopTransitionObserver))
        .with_locking(locking);

    let user_id = UserId::new();
    service
        .start_trial(user_id, TrialDays::DEFAULT)
        .await
        .unwrap();
    service.cancel(user_id, true).await.unwrap();

    (inner, gated, service, user_id)
}

fn outcome_is_conflict<T>(result: &Result<T, SubscriptionError>) -> bool {
    matches!(result, Err(SubscriptionError::ConcurrentModification(_)))
}

// =============================================================================
// Optimistic locking
// =============================================================================

#[tokio::test]
async fn concurrent_cancel_and_reactivate_one_wins_one_conflicts() {
    let (inner, gated, service, user_id) = setup(LockingStrategy::Optimistic).await;
    let version_before = inner.subscriptions()[0].version();
    gated.set_gate(Gate::Barrier(Arc::new(Barrier::new(2))));

    let (cancel, reactivate) =
        tokio::join!(service.cancel(user_id, false), service.reactivate(user_id));

    assert_eq!(
        [cancel.is_ok(), reactivate.is_ok()]
            .iter()
            .filter(|ok| **ok)
            .count(),
        1,
        "exactly one writer should win: {:?} / {:?}",
        cancel,
        reactivate
    );
    assert!(outcome_is_conflict(&cancel) || outcome_is_conflict(&reactivate));

    let loser = if cancel.is_err() { &cancel } else { &reactivate };
    assert!(loser.as_ref().unwrap_err().is_retryable());

    let stored = inner.subscriptions();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].version(), version_before + 1);
    // trial, deferred cancel, winner
    assert_eq!(inner.outbox_events().len(), 3);
}

#[tokio::test]
async fn retry_after_conflict_follows_the_transition_table() {
    let (inner, gated, service, user_id) = setup(LockingStrategy::Optimistic).await;
    gated.set_gate(Gate::Barrier(Arc::new(Barrier::new(2))));

    let (cancel, reactivate) =
        tokio::join!(service.cancel(user_id, false), service.reactivate(user_id));
    gated.set_gate(Gate::Open);

    let final_view = if outcome_is_conflict(&cancel) {
        // Reactivate won (ACTIVE); cancelling again is allowed.
        let view = service.cancel(user_id, false).await.unwrap();
        assert_eq!(view.status, SubscriptionStatus::Canceled);
        view
    } else {
        assert!(outcome_is_conflict(&reactivate));
        // Cancel won (CANCELED); reactivation is allowed from there.
        let view = service.reactivate(user_id).await.unwrap();
        assert_eq!(view.status, SubscriptionStatus::Active);
        assert!(!view.cancel_at_period_end);
        assert!(view.canceled_at.is_none());
        view
    };

    let stored = inner.subscriptions();
    assert_eq!(stored[0].status(), final_view.status);
    assert_eq!(inner.outbox_events().len(), 4);
}

#[tokio::test]
async fn concurrent_first_trials_create_one_line() {
    let inner = Arc::new(InMemorySubscriptionStore::new());
    let service = SubscriptionService::new(inner.clone(), Arc::new(NoopTransitionObserver));
    let user_id = UserId::new();

    let (a, b) = tokio::join!(
        service.start_trial(user_id, TrialDays::DEFAULT),
        service.start_trial(user_id, TrialDays::DEFAULT)
    );

    // The second caller either conflicts or, if it read after the first
    // commit, finds the trial already running.
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert_eq!(inner.subscriptions().len(), 1);
    assert_eq!(inner.outbox_events().len(), 1);
}

// =============================================================================
// Pessimistic locking
// =============================================================================

#[tokio::test]
async fn pessimistic_writers_queue_instead_of_conflicting() {
    let (inner, gated, service, user_id) = setup(LockingStrategy::Pessimistic).await;
    let version_before = inner.subscriptions()[0].version();
    gated.set_gate(Gate::Delay(Duration::from_millis(20)));

    let (cancel, reactivate) =
        tokio::join!(service.cancel(user_id, false), service.reactivate(user_id));

    assert!(cancel.is_ok(), "cancel failed: {:?}", cancel);
    assert!(reactivate.is_ok(), "reactivate failed: {:?}", reactivate);

    let stored = inner.subscriptions();
    assert_eq!(stored[0].version(), version_before + 2);
    assert_eq!(inner.outbox_events().len(), 4);
}

#[tokio::test]
async fn queued_writer_is_ordered_after_the_lock_holder() {
    let inner = Arc::new(InMemorySubscriptionStore::new());
    let service = Arc::new(
        SubscriptionService::new(inner.clone(), Arc::new(NoopTransitionObserver))
            .with_locking(LockingStrategy::Pessimistic),
    );
    let user_id = UserId::new();
    service
        .start_trial(user_id, TrialDays::DEFAULT)
        .await
        .unwrap();

    // Hold the row lock while a pessimistic cancel queues behind it.
    let mut holder = inner.begin().await.unwrap();
    let id = inner.subscriptions()[0].id();
    let locked = holder.lock_by_id(&id).await.unwrap().unwrap();

    let queued = {
        let service = service.clone();
        tokio::spawn(async move { service.cancel(user_id, true).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let activated_at = Timestamp::now();
    let transition =
        SubscriptionTransition::apply(locked, SubscriptionCommand::Activate, activated_at).unwrap();
    let record = transition.outbox_event(activated_at).unwrap();
    holder.update(&transition.after).await.unwrap();
    holder.append_outbox(&record).await.unwrap();
    holder.commit().await.unwrap();

    let canceled = queued.await.unwrap().unwrap();
    assert_eq!(canceled.status, SubscriptionStatus::Active);
    assert!(canceled.cancel_at_period_end);

    let order: Vec<String> = inner
        .find_unsent(None)
        .await
        .unwrap()
        .into_iter()
        .map(|event| event.event_type)
        .collect();
    assert_eq!(order, vec!["trial_started", "activated", "canceled"]);

    let stored = &inner.subscriptions()[0];
    assert_eq!(stored.version(), 2);
    assert!(!stored.updated_at().is_before(&activated_at));
}
