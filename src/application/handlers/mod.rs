//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod subscription;

pub use subscription::{
    // Shared unit of work
    LoadTarget, LockingStrategy, TransitionExecutor,
    // Commands
    BillingEvent, CancelSubscriptionCommand, CancelSubscriptionHandler,
    HandleBillingEventCommand, HandleBillingEventHandler, ReactivateSubscriptionCommand,
    ReactivateSubscriptionHandler, StartTrialCommand, StartTrialHandler,
    // Queries
    GetSubscriptionHandler, GetSubscriptionQuery,
};
