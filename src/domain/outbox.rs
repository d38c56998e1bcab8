//! Outbox records.
//!
//! An outbox record is written in the same transaction as the aggregate
//! change it describes and later delivered by the relay. `sent_at` is the
//! only field that ever changes, and only once.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, OutboxEventId, Timestamp};
use crate::domain::subscription::{
    SubscriptionEvent, SUBSCRIPTION_AGGREGATE_TYPE, SUBSCRIPTION_EVENTS_TOPIC,
};

/// A row in the outbox table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: OutboxEventId,
    pub topic: String,
    pub event_type: String,
    pub aggregate_type: String,
    /// Aggregate id as text; also the message key on the bus.
    pub aggregate_id: String,
    /// Serialized JSON payload.
    pub payload: String,
    pub created_at: Timestamp,
    /// None until the bus acknowledged the record.
    pub sent_at: Option<Timestamp>,
}

impl OutboxEvent {
    /// Create a new unsent outbox record.
    pub fn new(
        topic: impl Into<String>,
        event_type: impl Into<String>,
        aggregate_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        payload: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: OutboxEventId::new(),
            topic: topic.into(),
            event_type: event_type.into(),
            aggregate_type: aggregate_type.into(),
            aggregate_id: aggregate_id.into(),
            payload: payload.into(),
            created_at,
            sent_at: None,
        }
    }

    /// Serialize a subscription event into an outbox record.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if the payload cannot be encoded.
    pub fn for_subscription(
        event: &SubscriptionEvent,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let payload = serde_json::to_string(event).map_err(|e| {
            DomainError::new(
                ErrorCode::SerializationError,
                format!("Failed to serialize {} payload: {}", event.event_type(), e),
            )
        })?;

        Ok(Self::new(
            SUBSCRIPTION_EVENTS_TOPIC,
            event.event_type(),
            SUBSCRIPTION_AGGREGATE_TYPE,
            event.subscription_id().to_string(),
            payload,
            created_at,
        ))
    }

    pub fn is_sent(&self) -> bool {
        self.sent_at.is_some()
    }

    /// Mark the record as delivered.
    ///
    /// A record that is already sent keeps its original `sent_at`.
    pub fn mark_sent(&mut self, at: Timestamp) {
        if self.sent_at.is_none() {
            self.sent_at = Some(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{SubscriptionId, UserId};
    use crate::domain::subscription::Plan;

    fn past_due_event() -> SubscriptionEvent {
        SubscriptionEvent::PastDue {
            subscription_id: SubscriptionId::new(),
            user_id: UserId::new(),
            plan: Plan::Duo,
        }
    }

    #[test]
    fn for_subscription_fills_routing_fields() {
        let event = past_due_event();
        let record = OutboxEvent::for_subscription(&event, Timestamp::now()).unwrap();

        assert_eq!(record.topic, "subscription.events");
        assert_eq!(record.event_type, "past_due");
        assert_eq!(record.aggregate_type, "subscription");
        assert_eq!(record.aggregate_id, event.subscription_id().to_string());
        assert!(record.payload.contains("\"plan\":\"DUO\""));
        assert!(!record.is_sent());
    }

    #[test]
    fn mark_sent_only_sets_once() {
        let mut record = OutboxEvent::for_subscription(&past_due_event(), Timestamp::now()).unwrap();
        let first = Timestamp::now();
        record.mark_sent(first);
        record.mark_sent(first.plus_secs(60));

        assert_eq!(record.sent_at, Some(first));
    }
}
