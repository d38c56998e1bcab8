//! A command applied to a subscription, kept as a before/after pair.

use super::{Subscription, SubscriptionCommand, SubscriptionError, SubscriptionEvent};
use crate::domain::foundation::Timestamp;
use crate::domain::outbox::OutboxEvent;

/// Result of applying one command to one subscription.
///
/// Side effects (the outbox record, the transition metric) are derived from
/// this pair rather than recorded inside the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionTransition {
    pub command: SubscriptionCommand,
    pub before: Subscription,
    pub after: Subscription,
}

impl SubscriptionTransition {
    /// Applies `command` to `before`.
    pub fn apply(
        before: Subscription,
        command: SubscriptionCommand,
        now: Timestamp,
    ) -> Result<Self, SubscriptionError> {
        let after = before.apply(command, now)?;
        Ok(Self {
            command,
            before,
            after,
        })
    }

    pub fn event(&self) -> SubscriptionEvent {
        SubscriptionEvent::from_command(&self.command, &self.after)
    }

    /// Builds the outbox record for this transition.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the payload cannot be encoded.
    pub fn outbox_event(&self, now: Timestamp) -> Result<OutboxEvent, SubscriptionError> {
        Ok(OutboxEvent::for_subscription(&self.event(), now)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{SubscriptionId, UserId};
    use crate::domain::subscription::SubscriptionStatus;

    #[test]
    fn apply_keeps_before_untouched() {
        let now = Timestamp::now();
        let before = Subscription::new_free(SubscriptionId::new(), UserId::new(), now);
        let transition =
            SubscriptionTransition::apply(before.clone(), SubscriptionCommand::Activate, now).unwrap();

        assert_eq!(transition.before, before);
        assert_eq!(transition.after.status(), SubscriptionStatus::Active);
    }

    #[test]
    fn outbox_event_describes_after_state() {
        let now = Timestamp::now();
        let before = Subscription::new_free(SubscriptionId::new(), UserId::new(), now);
        let transition =
            SubscriptionTransition::apply(before, SubscriptionCommand::Activate, now).unwrap();

        let record = transition.outbox_event(now).unwrap();
        assert_eq!(record.event_type, "activated");
        assert!(record.payload.contains("\"status\":\"ACTIVE\""));
        assert_eq!(record.created_at, now);
    }
}
