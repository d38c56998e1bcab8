//! GetSubscriptionHandler - Query handler for a user's subscription.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::subscription::{Subscription, SubscriptionError};
use crate::ports::SubscriptionStore;

/// Query for the user's most recent subscription.
#[derive(Debug, Clone)]
pub struct GetSubscriptionQuery {
    pub user_id: UserId,
}

/// Handler for reading a user's subscription. Reads committed state only.
pub struct GetSubscriptionHandler {
    store: Arc<dyn SubscriptionStore>,
}

impl GetSubscriptionHandler {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionQuery,
    ) -> Result<Subscription, SubscriptionError> {
        self.store
            .find_latest_by_user(&query.user_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(query.user_id))
    }
}
