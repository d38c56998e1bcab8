//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, the state machine trait, and the error
//! types that form the vocabulary of the subscription domain.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{OutboxEventId, SubscriptionId, UserId};
pub use state_machine::{StateMachine, TransitionRejected};
pub use timestamp::Timestamp;
