//! TransitionObserver implementations.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::subscription::SubscriptionStatus;
use crate::ports::TransitionObserver;

/// Metric name used for status transition counts.
pub const TRANSITION_METRIC: &str = "subscriptions_state_transition_total";

/// Observer that drops every observation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransitionObserver;

impl TransitionObserver for NoopTransitionObserver {
    fn record_transition(&self, _from: SubscriptionStatus, _to: SubscriptionStatus) {}
}

/// Emits each transition as a structured log line.
///
/// Log pipelines aggregate these into the
/// `subscriptions_state_transition_total{from,to}` counter.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTransitionObserver;

impl TransitionObserver for TracingTransitionObserver {
    fn record_transition(&self, from: SubscriptionStatus, to: SubscriptionStatus) {
        tracing::info!(
            metric = TRANSITION_METRIC,
            from = from.as_str(),
            to = to.as_str(),
            "Subscription state transition"
        );
    }
}

/// Counts transitions per `(from, to)` pair, for test assertions.
///
/// A poisoned lock drops the observation; observations never fail a use case.
#[derive(Debug, Default)]
pub struct InMemoryTransitionCounter {
    counts: RwLock<HashMap<(SubscriptionStatus, SubscriptionStatus), u64>>,
}

impl InMemoryTransitionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded `from -> to` transitions.
    pub fn count(&self, from: SubscriptionStatus, to: SubscriptionStatus) -> u64 {
        self.counts
            .read()
            .map(|counts| counts.get(&(from, to)).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total observations across all pairs.
    pub fn total(&self) -> u64 {
        self.counts
            .read()
            .map(|counts| counts.values().sum())
            .unwrap_or(0)
    }
}

impl TransitionObserver for InMemoryTransitionCounter {
    fn record_transition(&self, from: SubscriptionStatus, to: SubscriptionStatus) {
        if let Ok(mut counts) = self.counts.write() {
            *counts.entry((from, to)).or_insert(0) += 1;
        }
    }
}
