//! Redis Streams implementation of the MessageBus port.
//!
//! Each topic maps to one stream. A record is appended with XADD and the
//! returned entry id is the acknowledgement.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

use crate::config::RedisConfig;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{BusMessage, MessageBus};

/// Message bus backed by Redis Streams.
#[derive(Clone)]
pub struct RedisStreamBus {
    conn: MultiplexedConnection,
    max_len: Option<usize>,
}

impl RedisStreamBus {
    /// Create a bus over an existing connection.
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            max_len: None,
        }
    }

    /// Trim streams approximately to `max_len` entries on every append.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    /// Open a multiplexed connection from configuration.
    pub async fn connect(config: &RedisConfig) -> Result<Self, DomainError> {
        let client = redis::Client::open(config.url.as_str()).map_err(bus_error)?;
        let conn = tokio::time::timeout(config.timeout(), client.get_multiplexed_tokio_connection())
            .await
            .map_err(|_| {
                DomainError::new(
                    ErrorCode::MessageBusError,
                    format!("Timed out connecting to Redis after {:?}", config.timeout()),
                )
            })?
            .map_err(bus_error)?;

        let bus = Self::new(conn);
        Ok(match config.stream_trim_len() {
            Some(max_len) => bus.with_max_len(max_len),
            None => bus,
        })
    }
}

/// `XADD <topic> [MAXLEN ~ n] * key .. value .. event_id .. event_type ..`
fn xadd_command(message: &BusMessage, max_len: Option<usize>) -> redis::Cmd {
    let mut cmd = redis::cmd("XADD");
    cmd.arg(&message.topic);
    if let Some(max_len) = max_len {
        cmd.arg("MAXLEN").arg("~").arg(max_len);
    }
    cmd.arg("*")
        .arg("key")
        .arg(&message.key)
        .arg("value")
        .arg(&message.value)
        .arg("event_id")
        .arg(message.event_id.to_string())
        .arg("event_type")
        .arg(&message.event_type);
    cmd
}

fn bus_error(e: redis::RedisError) -> DomainError {
    DomainError::new(ErrorCode::MessageBusError, format!("Redis error: {}", e))
}

#[async_trait]
impl MessageBus for RedisStreamBus {
    async fn publish(&self, message: &BusMessage) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();
        let entry_id: String = xadd_command(message, self.max_len)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::PublishFailed,
                    format!("XADD to {} failed: {}", message.topic, e),
                )
            })?;

        tracing::trace!(topic = %message.topic, entry_id = %entry_id, "Stream entry appended");
        Ok(())
    }
}
