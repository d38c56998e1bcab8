//! TransitionExecutor - Shared read-modify-write path for subscription commands.
//!
//! Every mutating use case runs the same unit of work:
//!
//! 1. Load the target subscription inside a store transaction
//! 2. Optionally re-read it under an exclusive lock
//! 3. Apply the command to get the new value
//! 4. Write the new value and its outbox record, then commit
//! 5. Report the transition to the observer

use serde::Deserialize;
use std::sync::Arc;

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{
    Subscription, SubscriptionCommand, SubscriptionError, SubscriptionTransition,
};
use crate::ports::{SubscriptionStore, SubscriptionTransaction, TransitionObserver};

/// How concurrent writers to one subscription are kept apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockingStrategy {
    /// Version-checked write; the loser gets `ConcurrentModification`.
    #[default]
    Optimistic,
    /// Exclusive row lock after loading; writers queue instead of failing.
    Pessimistic,
}

/// Which subscription a command acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTarget {
    /// The active line, or a new FREE line if the user has none.
    ActiveOrNew,
    /// The active line; `NotFound` otherwise.
    Active,
    /// The most recently created line, whatever its status.
    Latest,
}

/// Runs one command against one user's subscription.
#[derive(Clone)]
pub struct TransitionExecutor {
    store: Arc<dyn SubscriptionStore>,
    observer: Arc<dyn TransitionObserver>,
    locking: LockingStrategy,
}

impl TransitionExecutor {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        observer: Arc<dyn TransitionObserver>,
        locking: LockingStrategy,
    ) -> Self {
        Self {
            store,
            observer,
            locking,
        }
    }

    pub fn locking(&self) -> LockingStrategy {
        self.locking
    }

    /// Applies `command` and commits the result with exactly one outbox row.
    ///
    /// Returns the committed transition; `after` carries the stored version.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the target does not exist
    /// - `InvalidTransition` / `AlreadyInTrial` / `ValidationFailed` from the aggregate
    /// - `ConcurrentModification` if another writer committed first
    /// - `Serialization` / `Infrastructure` otherwise
    ///
    /// Nothing is persisted on any error.
    pub async fn execute(
        &self,
        user_id: UserId,
        target: LoadTarget,
        command: SubscriptionCommand,
    ) -> Result<SubscriptionTransition, SubscriptionError> {
        let mut tx = self.store.begin().await?;

        let found = self.load(&mut *tx, user_id, target).await?;

        // Read the clock only once the row is loaded (and locked), never
        // earlier than the stored change, so outbox rows follow commit order.
        let now = match &found {
            Some(current) => Timestamp::now().max(current.updated_at()),
            None => Timestamp::now(),
        };
        let is_new = found.is_none();
        let before = match found {
            Some(current) => current,
            None => Subscription::new_free(SubscriptionId::new(), user_id, now),
        };

        let mut transition = SubscriptionTransition::apply(before, command, now)?;
        let record = transition.outbox_event(now)?;

        if is_new {
            tx.insert(&transition.after).await?;
        } else {
            let version = tx.update(&transition.after).await?;
            transition.after = transition.after.with_version(version);
        }
        tx.append_outbox(&record).await?;
        tx.commit().await?;

        self.observer
            .record_transition(transition.before.status(), transition.after.status());

        tracing::info!(
            user_id = %user_id,
            subscription_id = %transition.after.id(),
            command = command.name(),
            from = %transition.before.status(),
            to = %transition.after.status(),
            event_id = %record.id,
            "Subscription command committed"
        );

        Ok(transition)
    }

    async fn load(
        &self,
        tx: &mut dyn SubscriptionTransaction,
        user_id: UserId,
        target: LoadTarget,
    ) -> Result<Option<Subscription>, SubscriptionError> {
        let found = match target {
            LoadTarget::ActiveOrNew | LoadTarget::Active => tx.find_active_by_user(&user_id).await?,
            LoadTarget::Latest => tx.find_latest_by_user(&user_id).await?,
        };

        let current = match (found, target) {
            (Some(current), _) => current,
            (None, LoadTarget::ActiveOrNew) => return Ok(None),
            (None, _) => return Err(SubscriptionError::not_found(user_id)),
        };

        if self.locking == LockingStrategy::Pessimistic {
            let locked = tx
                .lock_by_id(&current.id())
                .await?
                .ok_or_else(|| SubscriptionError::not_found(user_id))?;
            return Ok(Some(locked));
        }

        Ok(Some(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionStore;
    use crate::adapters::metrics::InMemoryTransitionCounter;
    use crate::domain::subscription::{SubscriptionStatus, TrialDays};

    struct Fixture {
        store: Arc<InMemorySubscriptionStore>,
        counter: Arc<InMemoryTransitionCounter>,
        executor: TransitionExecutor,
    }

    fn fixture(locking: LockingStrategy) -> Fixture {
        let store = Arc::new(InMemorySubscriptionStore::new());
        let counter = Arc::new(InMemoryTransitionCounter::new());
        let executor = TransitionExecutor::new(store.clone(), counter.clone(), locking);
        Fixture {
            store,
            counter,
            executor,
        }
    }

    fn trial() -> SubscriptionCommand {
        SubscriptionCommand::StartTrial {
            days: TrialDays::DEFAULT,
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Loading
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn active_or_new_inserts_fresh_line_at_version_zero() {
        let f = fixture(LockingStrategy::Optimistic);
        let user_id = UserId::new();

        let transition = f
            .executor
            .execute(user_id, LoadTarget::ActiveOrNew, trial())
            .await
            .unwrap();

        assert_eq!(transition.before.status(), SubscriptionStatus::Free);
        assert_eq!(transition.after.status(), SubscriptionStatus::Trialing);
        assert_eq!(transition.after.version(), 0);

        let stored = f.store.subscriptions();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], transition.after);
    }

    #[tokio::test]
    async fn active_target_without_subscription_is_not_found() {
        let f = fixture(LockingStrategy::Optimistic);
        let user_id = UserId::new();

        let err = f
            .executor
            .execute(user_id, LoadTarget::Active, SubscriptionCommand::Activate)
            .await
            .unwrap_err();

        assert_eq!(err, SubscriptionError::NotFound(user_id));
        assert!(f.store.outbox_events().is_empty());
        assert_eq!(f.counter.total(), 0);
    }

    #[tokio::test]
    async fn latest_target_finds_canceled_line() {
        let f = fixture(LockingStrategy::Optimistic);
        let user_id = UserId::new();
        f.executor
            .execute(user_id, LoadTarget::ActiveOrNew, trial())
            .await
            .unwrap();
        f.executor
            .execute(
                user_id,
                LoadTarget::Active,
                SubscriptionCommand::Cancel {
                    at_period_end: false,
                },
            )
            .await
            .unwrap();

        let transition = f
            .executor
            .execute(user_id, LoadTarget::Latest, SubscriptionCommand::Reactivate)
            .await
            .unwrap();

        assert_eq!(transition.before.status(), SubscriptionStatus::Canceled);
        assert_eq!(transition.after.status(), SubscriptionStatus::Active);
        assert_eq!(f.store.subscriptions().len(), 1);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Writes
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn each_command_appends_exactly_one_outbox_row() {
        let f = fixture(LockingStrategy::Optimistic);
        let user_id = UserId::new();

        f.executor
            .execute(user_id, LoadTarget::ActiveOrNew, trial())
            .await
            .unwrap();
        assert_eq!(f.store.outbox_events().len(), 1);

        f.executor
            .execute(user_id, LoadTarget::Active, SubscriptionCommand::Activate)
            .await
            .unwrap();

        let events = f.store.outbox_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "trial_started");
        assert_eq!(events[1].event_type, "activated");
    }

    #[tokio::test]
    async fn update_returns_stored_version() {
        let f = fixture(LockingStrategy::Optimistic);
        let user_id = UserId::new();
        f.executor
            .execute(user_id, LoadTarget::ActiveOrNew, trial())
            .await
            .unwrap();

        let transition = f
            .executor
            .execute(user_id, LoadTarget::Active, SubscriptionCommand::Activate)
            .await
            .unwrap();

        assert_eq!(transition.after.version(), 1);
        assert_eq!(f.store.subscriptions()[0].version(), 1);
    }

    #[tokio::test]
    async fn rejected_transition_persists_nothing() {
        let f = fixture(LockingStrategy::Optimistic);
        let user_id = UserId::new();
        f.executor
            .execute(user_id, LoadTarget::ActiveOrNew, trial())
            .await
            .unwrap();
        let before = f.store.subscriptions();

        let err = f
            .executor
            .execute(user_id, LoadTarget::Active, SubscriptionCommand::StartGracePeriod)
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::InvalidTransition { .. }));
        assert_eq!(f.store.subscriptions(), before);
        assert_eq!(f.store.outbox_events().len(), 1);
        assert_eq!(f.counter.total(), 1);
    }

    #[tokio::test]
    async fn failed_commit_persists_nothing_and_records_nothing() {
        let f = fixture(LockingStrategy::Optimistic);
        f.store.fail_next_commit();

        let err = f
            .executor
            .execute(UserId::new(), LoadTarget::ActiveOrNew, trial())
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::Infrastructure(_)));
        assert!(f.store.subscriptions().is_empty());
        assert!(f.store.outbox_events().is_empty());
        assert_eq!(f.counter.total(), 0);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Observation
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn observer_sees_committed_transitions_including_unchanged_status() {
        let f = fixture(LockingStrategy::Optimistic);
        let user_id = UserId::new();
        f.executor
            .execute(user_id, LoadTarget::ActiveOrNew, trial())
            .await
            .unwrap();
        f.executor
            .execute(
                user_id,
                LoadTarget::Active,
                SubscriptionCommand::Cancel {
                    at_period_end: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(
            f.counter
                .count(SubscriptionStatus::Free, SubscriptionStatus::Trialing),
            1
        );
        assert_eq!(
            f.counter
                .count(SubscriptionStatus::Trialing, SubscriptionStatus::Trialing),
            1
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Pessimistic locking
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn pessimistic_mode_applies_commands_like_optimistic() {
        let f = fixture(LockingStrategy::Pessimistic);
        let user_id = UserId::new();
        f.executor
            .execute(user_id, LoadTarget::ActiveOrNew, trial())
            .await
            .unwrap();

        let transition = f
            .executor
            .execute(user_id, LoadTarget::Active, SubscriptionCommand::Activate)
            .await
            .unwrap();

        assert_eq!(f.executor.locking(), LockingStrategy::Pessimistic);
        assert_eq!(transition.after.status(), SubscriptionStatus::Active);
        assert_eq!(transition.after.version(), 1);
    }

    #[tokio::test]
    async fn committed_change_is_never_stamped_before_the_stored_one() {
        let f = fixture(LockingStrategy::Optimistic);
        let user_id = UserId::new();
        let ahead = Timestamp::now().plus_secs(60);

        let mut tx = f.store.begin().await.unwrap();
        tx.insert(&Subscription::new_free(SubscriptionId::new(), user_id, ahead))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let transition = f
            .executor
            .execute(user_id, LoadTarget::ActiveOrNew, trial())
            .await
            .unwrap();

        assert!(!transition.after.updated_at().is_before(&ahead));
        let outbox = f.store.outbox_events();
        assert!(!outbox[0].created_at.is_before(&ahead));
    }

    #[test]
    fn locking_strategy_deserializes_lowercase() {
        let strategy: LockingStrategy = serde_json::from_str("\"pessimistic\"").unwrap();
        assert_eq!(strategy, LockingStrategy::Pessimistic);
        assert_eq!(LockingStrategy::default(), LockingStrategy::Optimistic);
    }
}
