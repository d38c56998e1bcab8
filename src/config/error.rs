//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid timeout for {0}")]
    InvalidTimeout(&'static str),

    #[error("Relay batch size must be at least 1")]
    InvalidBatchSize,

    #[error("Relay lease must outlive the publish timeout")]
    LeaseShorterThanPublishTimeout,

    #[error("Default trial days must be between 1 and 90, got {0}")]
    InvalidTrialDays(u32),

    #[error("Invalid log filter: {0}")]
    InvalidLogLevel(String),
}
