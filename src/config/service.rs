//! Subscription service configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::application::LockingStrategy;
use crate::domain::subscription::TrialDays;

/// Subscription use case settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Trial length when the caller does not pick one
    #[serde(default = "default_trial_days")]
    pub default_trial_days: u32,

    /// `optimistic` or `pessimistic`
    #[serde(default)]
    pub locking: LockingStrategy,
}

impl ServiceConfig {
    /// Default trial length as a checked value.
    pub fn trial_days(&self) -> Result<TrialDays, ValidationError> {
        TrialDays::try_new(self.default_trial_days)
            .map_err(|_| ValidationError::InvalidTrialDays(self.default_trial_days))
    }

    /// Validate service configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.trial_days().map(|_| ())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_trial_days: default_trial_days(),
            locking: LockingStrategy::default(),
        }
    }
}

fn default_trial_days() -> u32 {
    TrialDays::DEFAULT.value()
}
