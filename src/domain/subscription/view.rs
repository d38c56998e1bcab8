//! Read model returned to callers of the subscription use cases.

use serde::{Deserialize, Serialize};

use super::{Plan, Subscription, SubscriptionStatus};
use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};

/// Subscription as exposed to the request layer.
///
/// Leaves out `version` and `updated_at`, which are storage concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub trial_ends_at: Option<Timestamp>,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<&Subscription> for SubscriptionView {
    fn from(sub: &Subscription) -> Self {
        Self {
            id: sub.id(),
            user_id: sub.user_id(),
            plan: sub.plan(),
            status: sub.status(),
            trial_ends_at: sub.trial_ends_at(),
            current_period_start: sub.current_period_start(),
            current_period_end: sub.current_period_end(),
            cancel_at_period_end: sub.cancel_at_period_end(),
            canceled_at: sub.canceled_at(),
            created_at: sub.created_at(),
        }
    }
}

impl From<Subscription> for SubscriptionView {
    fn from(sub: Subscription) -> Self {
        SubscriptionView::from(&sub)
    }
}
