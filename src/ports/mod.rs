//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `SubscriptionStore` / `SubscriptionTransaction` - Atomic aggregate + outbox writes
//! - `OutboxStore` - Relay-side reads, delivery marks and the relay lease
//!
//! ## Delivery Ports
//!
//! - `MessageBus` - Publishing outbox records
//!
//! ## Observability Ports
//!
//! - `TransitionObserver` - Status transition metrics

mod message_bus;
mod outbox_store;
mod subscription_store;
mod transition_observer;

pub use message_bus::{BusMessage, MessageBus};
pub use outbox_store::OutboxStore;
pub use subscription_store::{SubscriptionStore, SubscriptionTransaction};
pub use transition_observer::TransitionObserver;
