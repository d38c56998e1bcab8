//! TransitionObserver port - Metrics hook for committed status changes.

use crate::domain::subscription::SubscriptionStatus;

/// Receives one call per committed use case.
///
/// Called after commit; a lost observation never affects stored state.
/// `from == to` is reported too (deferred cancel, billing period updates).
pub trait TransitionObserver: Send + Sync {
    fn record_transition(&self, from: SubscriptionStatus, to: SubscriptionStatus);
}
