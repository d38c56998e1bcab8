//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, state machine, errors)
//! - `subscription` - Subscription lifecycle state machine and events
//! - `outbox` - Outbox records awaiting delivery

pub mod foundation;
pub mod outbox;
pub mod subscription;
