//! In-memory subscription and outbox store.
//!
//! Both tables live behind one mutex so a commit applies the aggregate write
//! and its outbox rows in a single step, mirroring a database transaction.
//! Writes are staged in the transaction and checked again at commit.
//!
//! Used by tests and local runs. Failure injection (`fail_next_commit`,
//! `fail_next_mark_sent`) simulates a crash at the worst possible moment.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use crate::domain::foundation::{
    DomainError, ErrorCode, OutboxEventId, SubscriptionId, Timestamp, UserId,
};
use crate::domain::outbox::OutboxEvent;
use crate::domain::subscription::Subscription;
use crate::ports::{OutboxStore, SubscriptionStore, SubscriptionTransaction};

#[derive(Default)]
struct StoreState {
    /// Insertion order doubles as creation order.
    subscriptions: Vec<Subscription>,
    /// Insertion order breaks `created_at` ties.
    outbox: Vec<OutboxEvent>,
    lease: Option<RelayLease>,
}

struct RelayLease {
    holder: String,
    expires_at: Timestamp,
}

#[derive(Default)]
struct Faults {
    fail_next_commit: bool,
    fail_next_mark_sent: bool,
}

type RowLocks = HashMap<SubscriptionId, Arc<RowLock<()>>>;

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, DomainError> {
    mutex
        .lock()
        .map_err(|_| DomainError::database(format!("In-memory {} lock poisoned", what)))
}

/// In-memory implementation of [`SubscriptionStore`] and [`OutboxStore`].
///
/// # Panics
///
/// The test helper methods panic if the internal lock is poisoned. Port
/// methods return a `DatabaseError` instead.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(InMemorySubscriptionStore::new());
/// let service = SubscriptionService::new(store.clone(), Arc::new(NoopTransitionObserver));
///
/// service.start_trial(user_id, TrialDays::DEFAULT).await?;
/// assert_eq!(store.unsent_count(), 1);
/// ```
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    state: Arc<Mutex<StoreState>>,
    row_locks: Arc<Mutex<RowLocks>>,
    faults: Arc<Mutex<Faults>>,
}

impl InMemorySubscriptionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Makes the next commit fail without applying anything.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_next_commit(&self) {
        self.faults
            .lock()
            .expect("InMemorySubscriptionStore: faults lock poisoned")
            .fail_next_commit = true;
    }

    /// Makes the next `mark_sent` fail, as if the process died after the
    /// bus acknowledged but before the row was updated.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_next_mark_sent(&self) {
        self.faults
            .lock()
            .expect("InMemorySubscriptionStore: faults lock poisoned")
            .fail_next_mark_sent = true;
    }

    /// Returns all committed subscriptions in creation order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.state
            .lock()
            .expect("InMemorySubscriptionStore: state lock poisoned")
            .subscriptions
            .clone()
    }

    /// Returns every outbox row in insertion order, sent or not.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn outbox_events(&self) -> Vec<OutboxEvent> {
        self.state
            .lock()
            .expect("InMemorySubscriptionStore: state lock poisoned")
            .outbox
            .clone()
    }

    /// Returns the number of outbox rows not yet sent.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn unsent_count(&self) -> usize {
        self.outbox_events()
            .iter()
            .filter(|event| !event.is_sent())
            .count()
    }

    /// Appends an outbox row outside any use case.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn seed_outbox(&self, event: OutboxEvent) {
        self.state
            .lock()
            .expect("InMemorySubscriptionStore: state lock poisoned")
            .outbox
            .push(event);
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn begin(&self) -> Result<Box<dyn SubscriptionTransaction>, DomainError> {
        Ok(Box::new(InMemorySubscriptionTransaction {
            state: Arc::clone(&self.state),
            row_locks: Arc::clone(&self.row_locks),
            faults: Arc::clone(&self.faults),
            inserts: Vec::new(),
            updates: Vec::new(),
            outbox: Vec::new(),
            held: Vec::new(),
        }))
    }

    async fn find_latest_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let state = lock(&self.state, "state")?;
        Ok(latest_for_user(&state.subscriptions, user_id))
    }
}

#[async_trait]
impl OutboxStore for InMemorySubscriptionStore {
    async fn find_unsent(&self, limit: Option<u32>) -> Result<Vec<OutboxEvent>, DomainError> {
        let state = lock(&self.state, "state")?;
        let mut unsent: Vec<OutboxEvent> = state
            .outbox
            .iter()
            .filter(|event| !event.is_sent())
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        unsent.sort_by_key(|event| event.created_at);
        if let Some(limit) = limit {
            unsent.truncate(limit as usize);
        }
        Ok(unsent)
    }

    async fn mark_sent(&self, id: OutboxEventId, sent_at: Timestamp) -> Result<(), DomainError> {
        {
            let mut faults = lock(&self.faults, "faults")?;
            if faults.fail_next_mark_sent {
                faults.fail_next_mark_sent = false;
                return Err(DomainError::database("Simulated failure marking outbox row sent"));
            }
        }

        let mut state = lock(&self.state, "state")?;
        let event = state
            .outbox
            .iter_mut()
            .find(|event| event.id == id)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::OutboxEventNotFound,
                    format!("Outbox event not found: {}", id),
                )
            })?;
        event.mark_sent(sent_at);
        Ok(())
    }

    async fn try_acquire_relay_lease(
        &self,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, DomainError> {
        let now = Timestamp::now();
        let mut state = lock(&self.state, "state")?;
        let available = match &state.lease {
            None => true,
            Some(lease) => lease.holder == holder || !lease.expires_at.is_after(&now),
        };
        if available {
            state.lease = Some(RelayLease {
                holder: holder.to_string(),
                expires_at: now.plus_millis(ttl.as_millis() as u64),
            });
        }
        Ok(available)
    }

    async fn release_relay_lease(&self, holder: &str) -> Result<(), DomainError> {
        let mut state = lock(&self.state, "state")?;
        if state
            .lease
            .as_ref()
            .map_or(false, |lease| lease.holder == holder)
        {
            state.lease = None;
        }
        Ok(())
    }
}

/// Staged unit of work over [`InMemorySubscriptionStore`].
///
/// Reads see committed state overlaid with this transaction's own writes.
pub struct InMemorySubscriptionTransaction {
    state: Arc<Mutex<StoreState>>,
    row_locks: Arc<Mutex<RowLocks>>,
    faults: Arc<Mutex<Faults>>,
    inserts: Vec<Subscription>,
    /// Staged row plus the committed version it was read at.
    updates: Vec<(Subscription, i64)>,
    outbox: Vec<OutboxEvent>,
    held: Vec<(SubscriptionId, OwnedMutexGuard<()>)>,
}

impl InMemorySubscriptionTransaction {
    fn visible(&self) -> Result<Vec<Subscription>, DomainError> {
        let state = lock(&self.state, "state")?;
        let mut rows = state.subscriptions.clone();
        for (staged, expected) in &self.updates {
            if let Some(row) = rows.iter_mut().find(|row| row.id == staged.id) {
                *row = staged.clone().with_version(expected + 1);
            }
        }
        rows.extend(self.inserts.iter().cloned());
        Ok(rows)
    }

    fn row_lock(&self, id: &SubscriptionId) -> Result<Arc<RowLock<()>>, DomainError> {
        let mut locks = lock(&self.row_locks, "row lock table")?;
        Ok(Arc::clone(
            locks
                .entry(*id)
                .or_insert_with(|| Arc::new(RowLock::new(()))),
        ))
    }
}

fn latest_for_user(rows: &[Subscription], user_id: &UserId) -> Option<Subscription> {
    rows.iter()
        .filter(|row| row.user_id == *user_id)
        .max_by_key(|row| row.created_at)
        .cloned()
}

fn conflicting_active(rows: &[Subscription], candidate: &Subscription) -> bool {
    candidate.is_active()
        && rows
            .iter()
            .any(|row| row.id != candidate.id && row.user_id == candidate.user_id && row.is_active())
}

#[async_trait]
impl SubscriptionTransaction for InMemorySubscriptionTransaction {
    async fn find_active_by_user(
        &mut self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .visible()?
            .into_iter()
            .rev()
            .find(|row| row.user_id == *user_id && row.is_active()))
    }

    async fn find_latest_by_user(
        &mut self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(latest_for_user(&self.visible()?, user_id))
    }

    async fn lock_by_id(
        &mut self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError> {
        if !self.held.iter().any(|(held, _)| held == id) {
            let row_lock = self.row_lock(id)?;
            let guard = row_lock.lock_owned().await;
            self.held.push((*id, guard));
        }
        Ok(self.visible()?.into_iter().find(|row| row.id == *id))
    }

    async fn insert(&mut self, subscription: &Subscription) -> Result<(), DomainError> {
        let visible = self.visible()?;
        if visible.iter().any(|row| row.id == subscription.id) {
            return Err(DomainError::database(format!(
                "Subscription already exists: {}",
                subscription.id
            )));
        }
        if conflicting_active(&visible, subscription) {
            return Err(DomainError::concurrent_modification(format!(
                "User {} already has an active subscription",
                subscription.user_id
            )));
        }
        self.inserts.push(subscription.clone());
        Ok(())
    }

    async fn update(&mut self, subscription: &Subscription) -> Result<i64, DomainError> {
        if let Some(staged) = self.inserts.iter_mut().find(|row| row.id == subscription.id) {
            *staged = subscription.clone();
            return Ok(subscription.version);
        }

        let current = self
            .visible()?
            .into_iter()
            .find(|row| row.id == subscription.id)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    format!("Subscription not found: {}", subscription.id),
                )
            })?;
        if current.version != subscription.version {
            return Err(DomainError::concurrent_modification(format!(
                "Subscription {} is at version {}, write was based on version {}",
                subscription.id, current.version, subscription.version
            )));
        }

        let expected = self
            .updates
            .iter()
            .find(|(staged, _)| staged.id == subscription.id)
            .map(|(_, expected)| *expected)
            .unwrap_or(subscription.version);
        self.updates.retain(|(staged, _)| staged.id != subscription.id);
        self.updates.push((subscription.clone(), expected));
        Ok(subscription.version + 1)
    }

    async fn append_outbox(&mut self, event: &OutboxEvent) -> Result<(), DomainError> {
        self.outbox.push(event.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        {
            let mut faults = lock(&self.faults, "faults")?;
            if faults.fail_next_commit {
                faults.fail_next_commit = false;
                return Err(DomainError::database("Simulated failure during commit"));
            }
        }

        let this = *self;
        let mut state = lock(&this.state, "state")?;

        let mut next = state.subscriptions.clone();
        for (staged, expected) in &this.updates {
            let row = next
                .iter_mut()
                .find(|row| row.id == staged.id)
                .ok_or_else(|| {
                    DomainError::new(
                        ErrorCode::SubscriptionNotFound,
                        format!("Subscription not found: {}", staged.id),
                    )
                })?;
            if row.version != *expected {
                return Err(DomainError::concurrent_modification(format!(
                    "Subscription {} is at version {}, write was based on version {}",
                    staged.id, row.version, expected
                )));
            }
            *row = staged.clone().with_version(expected + 1);
        }
        next.extend(this.inserts.iter().cloned());

        let touched = this
            .inserts
            .iter()
            .chain(this.updates.iter().map(|(staged, _)| staged));
        for candidate in touched {
            if conflicting_active(&next, candidate) {
                return Err(DomainError::concurrent_modification(format!(
                    "User {} already has an active subscription",
                    candidate.user_id
                )));
            }
        }

        state.subscriptions = next;
        state.outbox.extend(this.outbox);
        Ok(())
    }
}
