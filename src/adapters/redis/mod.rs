//! Redis adapters.
//!
//! - `RedisStreamBus` - MessageBus over Redis Streams (XADD per topic)

mod stream_bus;

pub use stream_bus::RedisStreamBus;
