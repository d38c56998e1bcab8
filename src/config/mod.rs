//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `SUBSCRIPTION_SERVICE__` prefix and nested values use double underscores as
//! separators.
//!
//! # Example
//!
//! ```no_run
//! use subscription_service::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Relay polls every {:?}", config.relay.poll_interval());
//! ```

mod database;
mod error;
mod redis;
mod relay;
mod service;
mod telemetry;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use redis::RedisConfig;
pub use relay::RelayConfig;
pub use service::ServiceConfig;
pub use telemetry::{LogFormat, TelemetryConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Redis configuration (stream bus)
    pub redis: RedisConfig,

    /// Outbox relay configuration
    #[serde(default)]
    pub relay: RelayConfig,

    /// Subscription use case settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `SUBSCRIPTION_SERVICE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `SUBSCRIPTION_SERVICE__DATABASE__URL=...` -> `database.url = ...`
    /// - `SUBSCRIPTION_SERVICE__RELAY__POLL_INTERVAL_MS=500` -> `relay.poll_interval_ms = 500`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Required environment variables are missing
    /// - Values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SUBSCRIPTION_SERVICE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.redis.validate()?;
        self.relay.validate()?;
        self.service.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::LockingStrategy;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;
    use std::time::Duration;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Helper to set environment variables for testing
    /// Uses double underscores to separate nested config values
    fn set_minimal_env() {
        env::set_var(
            "SUBSCRIPTION_SERVICE__DATABASE__URL",
            "postgresql://test@localhost/test",
        );
        env::set_var("SUBSCRIPTION_SERVICE__REDIS__URL", "redis://localhost:6379");
    }

    /// Helper to clear environment variables after testing
    fn clear_env() {
        env::remove_var("SUBSCRIPTION_SERVICE__DATABASE__URL");
        env::remove_var("SUBSCRIPTION_SERVICE__REDIS__URL");
        env::remove_var("SUBSCRIPTION_SERVICE__RELAY__POLL_INTERVAL_MS");
        env::remove_var("SUBSCRIPTION_SERVICE__RELAY__BATCH_SIZE");
        env::remove_var("SUBSCRIPTION_SERVICE__SERVICE__LOCKING");
        env::remove_var("SUBSCRIPTION_SERVICE__SERVICE__DEFAULT_TRIAL_DAYS");
        env::remove_var("SUBSCRIPTION_SERVICE__REDIS__STREAM_MAX_LEN");
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(
            config.database.url.expose_secret(),
            "postgresql://test@localhost/test"
        );
        assert_eq!(config.redis.url, "redis://localhost:6379");
    }

    #[test]
    fn test_validate_full_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_section_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.relay.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.relay.batch_size, None);
        assert_eq!(config.service.default_trial_days, 14);
        assert_eq!(config.service.locking, LockingStrategy::Optimistic);
        assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("SUBSCRIPTION_SERVICE__RELAY__POLL_INTERVAL_MS", "250");
        env::set_var("SUBSCRIPTION_SERVICE__RELAY__BATCH_SIZE", "100");
        env::set_var("SUBSCRIPTION_SERVICE__SERVICE__LOCKING", "pessimistic");
        env::set_var("SUBSCRIPTION_SERVICE__SERVICE__DEFAULT_TRIAL_DAYS", "30");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.relay.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.relay.batch_size, Some(100));
        assert_eq!(config.service.locking, LockingStrategy::Pessimistic);
        assert_eq!(config.service.trial_days().unwrap().value(), 30);
    }

    #[test]
    fn test_stream_trimming_can_be_disabled() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("SUBSCRIPTION_SERVICE__REDIS__STREAM_MAX_LEN", "0");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.redis.stream_trim_len(), None);
    }

    #[test]
    fn test_missing_database_url_fails_to_load() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        env::set_var("SUBSCRIPTION_SERVICE__REDIS__URL", "redis://localhost:6379");
        let result = AppConfig::load();
        clear_env();

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
