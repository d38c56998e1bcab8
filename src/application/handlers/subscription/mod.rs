//! Subscription handlers.
//!
//! ## Commands
//! - Starting trials
//! - Cancelling and reactivating
//! - Applying billing outcomes (activation, delinquency, grace, expiry, period)
//!
//! ## Queries
//! - Get the user's subscription

mod billing_event;
mod cancel_subscription;
mod executor;
mod get_subscription;
mod reactivate_subscription;
mod start_trial;

pub use executor::{LoadTarget, LockingStrategy, TransitionExecutor};

// Commands
pub use billing_event::{BillingEvent, HandleBillingEventCommand, HandleBillingEventHandler};
pub use cancel_subscription::{CancelSubscriptionCommand, CancelSubscriptionHandler};
pub use reactivate_subscription::{ReactivateSubscriptionCommand, ReactivateSubscriptionHandler};
pub use start_trial::{StartTrialCommand, StartTrialHandler};

// Queries
pub use get_subscription::{GetSubscriptionHandler, GetSubscriptionQuery};
