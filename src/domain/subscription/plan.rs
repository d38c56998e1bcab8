//! Subscription plan definitions.

use crate::domain::foundation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subscription plan.
///
/// Only the FREE → INDIVIDUAL upgrade happens in this crate (when a trial
/// starts). The other paid plans are written by billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    Free,
    Individual,
    Duo,
    Family,
    Student,
}

impl Plan {
    pub const ALL: [Plan; 5] = [
        Plan::Free,
        Plan::Individual,
        Plan::Duo,
        Plan::Family,
        Plan::Student,
    ];

    /// Returns true if this plan is a paid plan.
    pub fn is_paid(&self) -> bool {
        !matches!(self, Plan::Free)
    }

    /// Stable storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "FREE",
            Plan::Individual => "INDIVIDUAL",
            Plan::Duo => "DUO",
            Plan::Family => "FAMILY",
            Plan::Student => "STUDENT",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Plan::ALL
            .into_iter()
            .find(|plan| plan.as_str() == s)
            .ok_or_else(|| ValidationError::invalid_format("plan", format!("unknown plan '{}'", s)))
    }
}
