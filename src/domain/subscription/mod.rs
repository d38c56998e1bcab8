//! Subscription domain module.
//!
//! Handles the subscription lifecycle: trials, activation, billing
//! delinquency, cancellation and expiry.
//!
//! # Module Structure
//!
//! - `status` - SubscriptionStatus state machine and transition table
//! - `aggregate` - Subscription aggregate with pure `apply`
//! - `events` - Events derived from committed mutations
//! - `view` - Read model returned to callers

mod aggregate;
mod command;
mod errors;
mod events;
mod plan;
mod status;
mod transition;
mod trial_days;
mod view;

pub use aggregate::Subscription;
pub use command::SubscriptionCommand;
pub use errors::{ErrorKind, SubscriptionError};
pub use events::{SubscriptionEvent, SUBSCRIPTION_AGGREGATE_TYPE, SUBSCRIPTION_EVENTS_TOPIC};
pub use plan::Plan;
pub use status::{can_transition, validate_transition, SubscriptionStatus};
pub use transition::SubscriptionTransition;
pub use trial_days::TrialDays;
pub use view::SubscriptionView;
