//! OutboxStore port - Relay-side access to the transactional outbox.
//!
//! Rows are appended by use cases through
//! [`SubscriptionTransaction::append_outbox`](super::SubscriptionTransaction::append_outbox).
//! The relay reads them back in creation order, publishes each one, and
//! marks it sent.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::foundation::{DomainError, OutboxEventId, Timestamp};
use crate::domain::outbox::OutboxEvent;

/// Port used by the outbox relay.
///
/// Implementations must:
/// - Return unsent rows ordered by `created_at`, ties in insertion order
/// - Never return a row whose `sent_at` is set
/// - Leave `sent_at` untouched once it has been set
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Unsent rows, oldest first. `None` means no limit.
    async fn find_unsent(&self, limit: Option<u32>) -> Result<Vec<OutboxEvent>, DomainError>;

    /// Record delivery of one row.
    async fn mark_sent(&self, id: OutboxEventId, sent_at: Timestamp) -> Result<(), DomainError>;

    /// Take or renew the relay lease for `holder`.
    ///
    /// Returns false while another holder's lease has not expired. Only the
    /// lease holder publishes, so rows are not delivered twice in parallel.
    async fn try_acquire_relay_lease(
        &self,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, DomainError>;

    /// Give up the lease if `holder` owns it.
    async fn release_relay_lease(&self, holder: &str) -> Result<(), DomainError>;
}
