//! OutboxRelay - Background service for reliable event delivery.
//!
//! This service implements the second half of the Transactional Outbox Pattern:
//! 1. Use cases write the aggregate and its outbox row in one transaction
//! 2. **OutboxRelay polls the outbox and publishes to the message bus** ← This module
//!
//! ## Delivery Rules
//!
//! - Rows go out oldest first; a row is marked sent only after the bus acked it
//! - The first failure (error or timeout) ends the cycle, and the next cycle
//!   starts again from that same row, so per-aggregate order is never broken
//! - A crash between ack and mark means the row is published again
//!   (at-least-once); consumers de-duplicate on the `event_id` header
//! - Only the holder of the relay lease publishes; the lease is renewed
//!   before every row and a cycle that loses it stops at once
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `poll_interval` | 1s | Delay between cycles |
//! | `publish_timeout` | 5s | Longest wait for a single bus ack |
//! | `batch_size` | none | Max rows per cycle |
//! | `lease_ttl` | 30s | Relay lease lifetime, renewed before every row |
//!
//! ## Graceful Shutdown
//!
//! The shutdown signal is checked between rows. A row already being
//! published finishes (or times out) before the relay stops.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::foundation::{DomainError, ErrorCode, OutboxEventId, Timestamp};
use crate::domain::outbox::OutboxEvent;
use crate::ports::{BusMessage, MessageBus, OutboxStore};

/// Configuration for the OutboxRelay service.
#[derive(Debug, Clone)]
pub struct OutboxRelayConfig {
    /// Delay between the end of one cycle and the start of the next.
    pub poll_interval: Duration,

    /// Longest wait for one publish acknowledgement.
    pub publish_timeout: Duration,

    /// Maximum rows per cycle; `None` drains everything unsent.
    pub batch_size: Option<u32>,

    /// Lifetime of the relay lease.
    pub lease_ttl: Duration,

    /// Lease holder name for this instance.
    pub instance_id: String,
}

impl Default for OutboxRelayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            publish_timeout: Duration::from_secs(5),
            batch_size: None,
            lease_ttl: Duration::from_secs(30),
            instance_id: format!("outbox-relay-{}", uuid::Uuid::new_v4()),
        }
    }
}

impl OutboxRelayConfig {
    /// Create config with custom poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Create config with custom publish timeout.
    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = timeout;
        self
    }

    /// Create config with custom batch size.
    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Create config with custom lease lifetime.
    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }

    /// Create config with a fixed instance id.
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }
}

/// What one relay cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayCycleReport {
    /// Rows published and marked sent.
    pub published: usize,

    /// Row whose publish (or mark) failed; the next cycle restarts there.
    pub halted_on: Option<OutboxEventId>,

    /// Another instance holds the lease; nothing was read.
    pub skipped_no_lease: bool,

    /// The lease expired and was taken over mid-cycle; remaining rows were left.
    pub lease_lost: bool,

    /// Shutdown was requested before every row was handled.
    pub interrupted: bool,
}

/// Background service that publishes rows from the outbox.
pub struct OutboxRelay {
    outbox: Arc<dyn OutboxStore>,
    bus: Arc<dyn MessageBus>,
    config: OutboxRelayConfig,
}

impl OutboxRelay {
    /// Create a new OutboxRelay with default configuration.
    pub fn new(outbox: Arc<dyn OutboxStore>, bus: Arc<dyn MessageBus>) -> Self {
        Self::with_config(outbox, bus, OutboxRelayConfig::default())
    }

    /// Create a new OutboxRelay with custom configuration.
    pub fn with_config(
        outbox: Arc<dyn OutboxStore>,
        bus: Arc<dyn MessageBus>,
        config: OutboxRelayConfig,
    ) -> Self {
        Self {
            outbox,
            bus,
            config,
        }
    }

    pub fn config(&self) -> &OutboxRelayConfig {
        &self.config
    }

    /// Run the relay loop until shutdown signal is received.
    ///
    /// A failing cycle is logged and retried on the next tick; it never
    /// stops the loop.
    ///
    /// # Returns
    ///
    /// Returns `Ok(())` on graceful shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), DomainError> {
        let mut interval = time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            instance_id = %self.config.instance_id,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Outbox relay started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = interval.tick() => {
                    if let Err(e) = self.run_cycle(&shutdown).await {
                        warn!(error = %e, "Outbox relay cycle failed");
                    }
                }
            }
        }

        if let Err(e) = self.outbox.release_relay_lease(&self.config.instance_id).await {
            warn!(error = %e, "Failed to release outbox relay lease");
        }
        info!(instance_id = %self.config.instance_id, "Outbox relay stopped");
        Ok(())
    }

    /// Run exactly one cycle without a shutdown signal (for testing and tools).
    pub async fn poll_once(&self) -> Result<RelayCycleReport, DomainError> {
        let (_keep_open, shutdown) = watch::channel(false);
        self.run_cycle(&shutdown).await
    }

    /// Run one cycle: take the lease, then publish unsent rows in order.
    pub async fn run_cycle(
        &self,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<RelayCycleReport, DomainError> {
        let mut report = RelayCycleReport::default();

        if !self.renew_lease().await? {
            debug!(
                instance_id = %self.config.instance_id,
                "Outbox relay lease held elsewhere; skipping cycle"
            );
            report.skipped_no_lease = true;
            return Ok(report);
        }

        let rows = self.outbox.find_unsent(self.config.batch_size).await?;

        for row in rows {
            if *shutdown.borrow() {
                report.interrupted = true;
                break;
            }

            // A publish is bounded by publish_timeout, which is shorter than
            // the lease, so the row is delivered while the lease still holds.
            if !self.renew_lease().await? {
                warn!(
                    instance_id = %self.config.instance_id,
                    event_id = %row.id,
                    "Outbox relay lease lost; halting cycle"
                );
                report.lease_lost = true;
                break;
            }

            if let Err(e) = self.deliver(&row).await {
                warn!(
                    event_id = %row.id,
                    event_type = %row.event_type,
                    aggregate_id = %row.aggregate_id,
                    error = %e,
                    "Outbox publish failed; halting cycle"
                );
                report.halted_on = Some(row.id);
                break;
            }
            report.published += 1;
        }

        Ok(report)
    }

    async fn renew_lease(&self) -> Result<bool, DomainError> {
        self.outbox
            .try_acquire_relay_lease(&self.config.instance_id, self.config.lease_ttl)
            .await
    }

    async fn deliver(&self, row: &OutboxEvent) -> Result<(), DomainError> {
        let message = BusMessage::from(row);

        match time::timeout(self.config.publish_timeout, self.bus.publish(&message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(DomainError::new(
                    ErrorCode::PublishTimeout,
                    format!(
                        "No acknowledgement within {} ms",
                        self.config.publish_timeout.as_millis()
                    ),
                ))
            }
        }

        self.outbox.mark_sent(row.id, Timestamp::now()).await?;

        debug!(
            event_id = %row.id,
            topic = %row.topic,
            event_type = %row.event_type,
            aggregate_id = %row.aggregate_id,
            "Published outbox event"
        );
        Ok(())
    }
}
