//! In-memory message bus for testing.
//!
//! Captures acknowledged messages for assertions and can be told to fail or
//! stall, so relay behaviour under bus outages is testable without a broker.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in production.
//! It uses `.expect()` on lock operations which will panic if locks are poisoned.
//! Production code should use the Redis Streams adapter.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;
use std::time::Duration;

use crate::domain::foundation::{DomainError, ErrorCode, OutboxEventId};
use crate::ports::{BusMessage, MessageBus};

#[derive(Default)]
struct Behaviour {
    /// Fail this many upcoming publishes.
    fail_next: usize,
    /// Always reject these events.
    reject: HashSet<OutboxEventId>,
    /// Delay applied before acknowledging.
    delay: Option<Duration>,
}

/// In-memory message bus.
///
/// # Panics
///
/// Methods may panic if internal locks are poisoned. This is acceptable
/// for test code but this adapter should NOT be used in production.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryMessageBus::new());
/// bus.fail_next(1);
///
/// relay.poll_once().await?;
/// assert_eq!(bus.message_count(), 0);
/// assert_eq!(bus.attempt_count(), 1);
/// ```
#[derive(Default)]
pub struct InMemoryMessageBus {
    published: RwLock<Vec<BusMessage>>,
    attempts: RwLock<Vec<BusMessage>>,
    behaviour: RwLock<Behaviour>,
}

impl InMemoryMessageBus {
    /// Creates a new bus that acknowledges everything.
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Fail the next `count` publishes.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_next(&self, count: usize) {
        self.behaviour
            .write()
            .expect("InMemoryMessageBus: behaviour lock poisoned")
            .fail_next = count;
    }

    /// Reject every publish of `event_id` until [`heal`](Self::heal) is called.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn reject_event(&self, event_id: OutboxEventId) {
        self.behaviour
            .write()
            .expect("InMemoryMessageBus: behaviour lock poisoned")
            .reject
            .insert(event_id);
    }

    /// Wait `delay` before acknowledging each publish.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_delay(&self, delay: Duration) {
        self.behaviour
            .write()
            .expect("InMemoryMessageBus: behaviour lock poisoned")
            .delay = Some(delay);
    }

    /// Clears all injected failures and delays.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn heal(&self) {
        *self
            .behaviour
            .write()
            .expect("InMemoryMessageBus: behaviour lock poisoned") = Behaviour::default();
    }

    /// Returns all acknowledged messages in publish order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn published_messages(&self) -> Vec<BusMessage> {
        self.published
            .read()
            .expect("InMemoryMessageBus: published lock poisoned")
            .clone()
    }

    /// Returns every publish attempt, acknowledged or not.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn attempts(&self) -> Vec<BusMessage> {
        self.attempts
            .read()
            .expect("InMemoryMessageBus: attempts lock poisoned")
            .clone()
    }

    /// Returns count of acknowledged messages.
    pub fn message_count(&self) -> usize {
        self.published_messages().len()
    }

    /// Returns count of publish attempts.
    pub fn attempt_count(&self) -> usize {
        self.attempts().len()
    }

    /// Event types of acknowledged messages, in order.
    pub fn published_event_types(&self) -> Vec<String> {
        self.published_messages()
            .into_iter()
            .map(|message| message.event_type)
            .collect()
    }

    /// Checks if a specific event type was acknowledged.
    pub fn has_event(&self, event_type: &str) -> bool {
        self.published_messages()
            .iter()
            .any(|message| message.event_type == event_type)
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn publish(&self, message: &BusMessage) -> Result<(), DomainError> {
        self.attempts
            .write()
            .map_err(|_| DomainError::new(ErrorCode::MessageBusError, "attempts lock poisoned"))?
            .push(message.clone());

        let (fail, delay) = {
            let mut behaviour = self.behaviour.write().map_err(|_| {
                DomainError::new(ErrorCode::MessageBusError, "behaviour lock poisoned")
            })?;
            let fail = if behaviour.reject.contains(&message.event_id) {
                true
            } else if behaviour.fail_next > 0 {
                behaviour.fail_next -= 1;
                true
            } else {
                false
            };
            (fail, behaviour.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if fail {
            return Err(DomainError::new(
                ErrorCode::PublishFailed,
                format!("Bus rejected {} ({})", message.event_id, message.event_type),
            ));
        }

        self.published
            .write()
            .map_err(|_| DomainError::new(ErrorCode::MessageBusError, "published lock poisoned"))?
            .push(message.clone());
        Ok(())
    }
}
