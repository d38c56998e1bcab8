//! Event delivery adapters.
//!
//! - `OutboxRelay` - Background service moving outbox rows to the message bus

mod outbox_relay;

pub use outbox_relay::{OutboxRelay, OutboxRelayConfig, RelayCycleReport};
