//! MessageBus port - Interface for delivering outbox records.
//!
//! The relay is the only caller. Delivery is at-least-once: a record may be
//! published again if the process dies after the bus acknowledged it but
//! before the row was marked sent, so every record carries its outbox id.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OutboxEventId};
use crate::domain::outbox::OutboxEvent;

/// A message ready for the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    /// Partitioning key (the aggregate id), keeping per-aggregate order.
    pub key: String,
    pub value: String,
    pub event_id: OutboxEventId,
    pub event_type: String,
}

impl From<&OutboxEvent> for BusMessage {
    fn from(event: &OutboxEvent) -> Self {
        Self {
            topic: event.topic.clone(),
            key: event.aggregate_id.clone(),
            value: event.payload.clone(),
            event_id: event.id,
            event_type: event.event_type.clone(),
        }
    }
}

/// Port for publishing to the message bus.
///
/// `publish` returns once the bus has acknowledged the message. Callers
/// bound the wait themselves.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, message: &BusMessage) -> Result<(), DomainError>;
}
