//! Outbox relay configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::events::OutboxRelayConfig;

/// Outbox relay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Delay between relay cycles in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Longest wait for one bus acknowledgement in milliseconds
    #[serde(default = "default_publish_timeout")]
    pub publish_timeout_ms: u64,

    /// Maximum rows per cycle; unset drains everything
    pub batch_size: Option<u32>,

    /// Relay lease lifetime in seconds
    #[serde(default = "default_lease_ttl")]
    pub lease_ttl_secs: u64,

    /// Lease holder name; a random one is generated when unset
    pub instance_id: Option<String>,
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }

    /// Validate relay configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.poll_interval_ms == 0 {
            return Err(ValidationError::InvalidTimeout("relay poll interval"));
        }
        if self.publish_timeout_ms == 0 {
            return Err(ValidationError::InvalidTimeout("relay publish"));
        }
        if self.batch_size == Some(0) {
            return Err(ValidationError::InvalidBatchSize);
        }
        if self.lease_ttl() <= self.publish_timeout() {
            return Err(ValidationError::LeaseShorterThanPublishTimeout);
        }
        Ok(())
    }

    /// Settings for [`OutboxRelay`](crate::adapters::events::OutboxRelay).
    pub fn to_relay_config(&self) -> OutboxRelayConfig {
        let mut config = OutboxRelayConfig::default()
            .with_poll_interval(self.poll_interval())
            .with_publish_timeout(self.publish_timeout())
            .with_lease_ttl(self.lease_ttl());
        if let Some(size) = self.batch_size {
            config = config.with_batch_size(size);
        }
        if let Some(id) = &self.instance_id {
            config = config.with_instance_id(id.clone());
        }
        config
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            publish_timeout_ms: default_publish_timeout(),
            batch_size: None,
            lease_ttl_secs: default_lease_ttl(),
            instance_id: None,
        }
    }
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_publish_timeout() -> u64 {
    5000
}

fn default_lease_ttl() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_config_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.publish_timeout(), Duration::from_secs(5));
        assert_eq!(config.lease_ttl(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_to_relay_config() {
        let config = RelayConfig {
            poll_interval_ms: 250,
            batch_size: Some(50),
            instance_id: Some("relay-a".to_string()),
            ..Default::default()
        };
        let relay = config.to_relay_config();

        assert_eq!(relay.poll_interval, Duration::from_millis(250));
        assert_eq!(relay.publish_timeout, Duration::from_secs(5));
        assert_eq!(relay.batch_size, Some(50));
        assert_eq!(relay.instance_id, "relay-a");
    }

    #[test]
    fn test_unset_instance_id_is_generated() {
        let relay = RelayConfig::default().to_relay_config();
        assert!(relay.instance_id.starts_with("outbox-relay-"));
        assert_eq!(relay.batch_size, None);
    }

    #[test]
    fn test_validation_zero_batch() {
        let config = RelayConfig {
            batch_size: Some(0),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidBatchSize));
    }

    #[test]
    fn test_validation_lease_must_outlive_publish() {
        let config = RelayConfig {
            publish_timeout_ms: 10_000,
            lease_ttl_secs: 5,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::LeaseShorterThanPublishTimeout)
        );
    }

    #[test]
    fn test_validation_zero_poll_interval() {
        let config = RelayConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
