//! Transient user-facing notices: one per operation outcome.

use core::fmt;

use serde::Serialize;

use crate::error::{ApiError, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl From<&ServiceError> for Notice {
    fn from(err: &ServiceError) -> Self {
        let title = match err {
            ServiceError::Validation(_) => "Missing information",
            ServiceError::NotFound(_) => "Not found",
            ServiceError::InsufficientStock(_) => "Insufficient stock",
            ServiceError::InvalidTransition { .. } => "Already finalized",
            ServiceError::Network(ApiError::Unauthorized) | ServiceError::InvalidCredentials => {
                "Login failed"
            }
            ServiceError::Network(_) => "Request failed",
            ServiceError::NotLoggedIn => "Not logged in",
            ServiceError::Store(_) => "Local storage error",
            ServiceError::RolledBack { .. } => "Rolled back",
            ServiceError::PartiallyApplied { .. } => "Partially applied",
        };
        Notice::error(title, err.to_string())
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            NoticeLevel::Success => "success",
            NoticeLevel::Error => "error",
        };
        write!(f, "[{level}] {}: {}", self.title, self.description)
    }
}
