//! Subscription-specific error types.
//!
//! # Request Layer Mapping
//!
//! | Error | Kind |
//! |-------|------|
//! | InvalidTransition | Conflict |
//! | AlreadyInTrial | Conflict |
//! | ConcurrentModification | Conflict |
//! | NotFound | NotFound |
//! | ValidationFailed | BadRequest |
//! | Serialization | Internal |
//! | Infrastructure | Internal |

use thiserror::Error;

use super::SubscriptionStatus;
use crate::domain::foundation::{
    DomainError, ErrorCode, SubscriptionId, TransitionRejected, UserId, ValidationError,
};

/// Coarse classification a request layer maps to a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Conflict,
    NotFound,
    BadRequest,
    Internal,
}

/// Errors returned by subscription use cases.
///
/// None of them leaves a partial write behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("Cannot transition subscription from {from} to {to}")]
    InvalidTransition {
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    },

    #[error("Subscription {0} is already in trial")]
    AlreadyInTrial(SubscriptionId),

    #[error("No subscription found for user {0}")]
    NotFound(UserId),

    #[error("Subscription was modified concurrently: {0}")]
    ConcurrentModification(String),

    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    #[error("Failed to serialize event payload: {0}")]
    Serialization(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl SubscriptionError {
    pub fn not_found(user_id: UserId) -> Self {
        SubscriptionError::NotFound(user_id)
    }

    pub fn already_in_trial(id: SubscriptionId) -> Self {
        SubscriptionError::AlreadyInTrial(id)
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SubscriptionError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        SubscriptionError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SubscriptionError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            SubscriptionError::AlreadyInTrial(_) => ErrorCode::AlreadyInTrial,
            SubscriptionError::NotFound(_) => ErrorCode::SubscriptionNotFound,
            SubscriptionError::ConcurrentModification(_) => ErrorCode::ConcurrentModification,
            SubscriptionError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            SubscriptionError::Serialization(_) => ErrorCode::SerializationError,
            SubscriptionError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Classification for the request layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubscriptionError::InvalidTransition { .. }
            | SubscriptionError::AlreadyInTrial(_)
            | SubscriptionError::ConcurrentModification(_) => ErrorKind::Conflict,
            SubscriptionError::NotFound(_) => ErrorKind::NotFound,
            SubscriptionError::ValidationFailed { .. } => ErrorKind::BadRequest,
            SubscriptionError::Serialization(_) | SubscriptionError::Infrastructure(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Returns true if running the whole use case again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubscriptionError::ConcurrentModification(_))
    }
}

impl From<TransitionRejected<SubscriptionStatus>> for SubscriptionError {
    fn from(rejected: TransitionRejected<SubscriptionStatus>) -> Self {
        SubscriptionError::InvalidTransition {
            from: rejected.from,
            to: rejected.to,
        }
    }
}

impl From<ValidationError> for SubscriptionError {
    fn from(err: ValidationError) -> Self {
        SubscriptionError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ConcurrentModification => {
                SubscriptionError::ConcurrentModification(err.message)
            }
            ErrorCode::SerializationError => SubscriptionError::Serialization(err.message),
            ErrorCode::ValidationFailed | ErrorCode::OutOfRange | ErrorCode::InvalidFormat => {
                let field = err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string());
                SubscriptionError::ValidationFailed {
                    field,
                    message: err.message,
                }
            }
            _ => SubscriptionError::Infrastructure(err.to_string()),
        }
    }
}

impl From<SubscriptionError> for DomainError {
    fn from(err: SubscriptionError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}
