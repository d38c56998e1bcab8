//! Trial length value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ValidationError;

/// Number of trial days, between 1 and 90 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TrialDays(u32);

impl TrialDays {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 90;

    /// Trial length used when the caller does not pick one.
    pub const DEFAULT: Self = Self(14);

    /// Creates a TrialDays, returning error if out of range.
    pub fn try_new(days: u32) -> Result<Self, ValidationError> {
        if !(Self::MIN..=Self::MAX).contains(&days) {
            return Err(ValidationError::out_of_range(
                "trial_days",
                i64::from(Self::MIN),
                i64::from(Self::MAX),
                i64::from(days),
            ));
        }
        Ok(Self(days))
    }

    /// Returns the number of days.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Trial length in seconds (days × 86400).
    pub fn as_secs(&self) -> u64 {
        u64::from(self.0) * 86_400
    }
}

impl Default for TrialDays {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for TrialDays {
    type Error = ValidationError;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        Self::try_new(days)
    }
}

impl From<TrialDays> for u32 {
    fn from(days: TrialDays) -> Self {
        days.0
    }
}

impl fmt::Display for TrialDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.0)
    }
}
