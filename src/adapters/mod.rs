//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `events` - Outbox relay moving committed events to the bus
//! - `memory` - In-memory stores and bus for tests and local runs
//! - `metrics` - Transition observers
//! - `postgres` - PostgreSQL stores
//! - `redis` - Redis Streams message bus

pub mod events;
pub mod memory;
pub mod metrics;
pub mod postgres;
pub mod redis;

pub use events::{OutboxRelay, OutboxRelayConfig, RelayCycleReport};
pub use memory::{InMemoryMessageBus, InMemorySubscriptionStore};
pub use metrics::{InMemoryTransitionCounter, NoopTransitionObserver, TracingTransitionObserver};
