//! Client error types.
//!
//! [`ApiError`] is what a single HTTP exchange can fail with. [`ServiceError`]
//! is what a user-facing operation fails with, including multi-step workflows
//! that committed part of their work.

use karatbook_core::DomainError;

use crate::reconciler::SagaStep;
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error(transparent)]
    Network(#[from] ApiError),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("not logged in")]
    NotLoggedIn,

    #[error("client storage error: {0}")]
    Store(#[from] StoreError),

    /// A later step failed and every committed step was undone.
    #[error("{failed} failed, earlier steps rolled back: {cause}")]
    RolledBack { failed: SagaStep, cause: ApiError },

    /// A later step failed and some committed steps remain in effect.
    #[error("{failed} failed after committing {}: {cause}", SagaStep::join(.committed))]
    PartiallyApplied {
        failed: SagaStep,
        committed: Vec<SagaStep>,
        cause: ApiError,
    },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvariantViolation(msg)
            | DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::NotFound(what) => ServiceError::NotFound(what),
            DomainError::InsufficientStock(msg) => ServiceError::InsufficientStock(msg),
            DomainError::InvalidTransition { from, to } => {
                ServiceError::InvalidTransition { from, to }
            }
        }
    }
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
