//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers share one transactional path (`TransitionExecutor`);
//! the query handler reads committed state only.

pub mod handlers;
mod subscription_service;

pub use handlers::{LoadTarget, LockingStrategy, TransitionExecutor};
pub use subscription_service::SubscriptionService;
