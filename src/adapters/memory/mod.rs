//! In-memory adapters for tests and local runs.

mod message_bus;
mod subscription_store;

pub use message_bus::InMemoryMessageBus;
pub use subscription_store::{InMemorySubscriptionStore, InMemorySubscriptionTransaction};
