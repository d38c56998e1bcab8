//! SubscriptionStore port - Transactional persistence of subscriptions.
//!
//! A use case opens one [`SubscriptionTransaction`], reads the aggregate,
//! writes the new version together with its outbox record, and commits.
//! Everything written through a transaction becomes visible at commit or
//! not at all.
//!
//! ## Pattern Overview
//!
//! 1. `begin()` opens the unit of work
//! 2. Reads: `find_active_by_user`, `find_latest_by_user`, or `lock_by_id`
//! 3. Writes: `insert` or version-checked `update`, then `append_outbox`
//! 4. `commit()`; dropping the transaction instead rolls everything back

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SubscriptionId, UserId};
use crate::domain::outbox::OutboxEvent;
use crate::domain::subscription::Subscription;

/// Port for opening transactions and for reads outside a transaction.
///
/// # Example
///
/// ```ignore
/// let mut tx = store.begin().await?;
/// let current = tx.find_active_by_user(&user_id).await?.ok_or(NotFound)?;
/// let next = current.reactivate(now)?;
/// let version = tx.update(&next).await?;
/// tx.append_outbox(&outbox_event).await?;
/// tx.commit().await?;
/// ```
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Open a new transaction.
    async fn begin(&self) -> Result<Box<dyn SubscriptionTransaction>, DomainError>;

    /// The user's most recently created subscription, committed state only.
    async fn find_latest_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError>;
}

/// One atomic unit of work against subscriptions and the outbox.
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// every write made through it.
#[async_trait]
pub trait SubscriptionTransaction: Send {
    /// The user's subscription whose status is not CANCELED or EXPIRED.
    async fn find_active_by_user(
        &mut self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// The user's most recently created subscription regardless of status.
    async fn find_latest_by_user(
        &mut self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Read a subscription and hold an exclusive lock on it until the
    /// transaction ends.
    async fn lock_by_id(
        &mut self,
        id: &SubscriptionId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Insert a new subscription line at its current version.
    ///
    /// Fails with `ConcurrentModification` if the user already has an
    /// active subscription and this one is active too.
    async fn insert(&mut self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Write a modified subscription.
    ///
    /// `subscription.version()` must equal the stored version; returns the
    /// new stored version. A mismatch fails with `ConcurrentModification`,
    /// either here or at commit.
    async fn update(&mut self, subscription: &Subscription) -> Result<i64, DomainError>;

    /// Append an outbox record in this transaction.
    async fn append_outbox(&mut self, event: &OutboxEvent) -> Result<(), DomainError>;

    /// Make every write in this transaction durable.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;
}
