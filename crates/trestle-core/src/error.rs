//! Unified error handling for Trestle Core.
//!
//! Wraps domain and application errors behind one type so front ends can
//! render every failure the same way: message, category, suggestions.

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;

/// Root error type for Trestle Core operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrestleError {
    /// Invalid values (names, versions, invocations).
    #[error("{0}")]
    Domain(#[from] DomainError),

    /// Dispatch failures.
    #[error("{0}")]
    Application(#[from] ApplicationError),

    /// Configuration or setup errors.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Unexpected internal errors (bugs).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl TrestleError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Domain(e) => e.suggestions(),
            Self::Application(e) => e.suggestions(),
            Self::Configuration { message } => vec![
                format!("Configuration issue: {}", message),
                "Run 'trestle config path' to see which file is loaded".into(),
            ],
            Self::Internal { .. } => vec!["This appears to be a bug in Trestle".into()],
        }
    }

    /// Get error category for display and exit codes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Domain(e) => match e.category() {
                crate::domain::ErrorCategory::Validation => ErrorCategory::Validation,
                crate::domain::ErrorCategory::Internal => ErrorCategory::Internal,
            },
            Self::Application(e) => e.category(),
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Dispatch failures are never retried automatically.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Exit code of a child that ran and failed, if that is what happened.
    pub fn child_exit_code(&self) -> Option<i32> {
        match self {
            Self::Application(ApplicationError::NonZeroExit { code }) => Some(*code),
            _ => None,
        }
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Environment,
    Configuration,
    CommandFailed,
    Internal,
}

/// Convenient result type alias.
pub type TrestleResult<T> = Result<T, TrestleError>;

/// Extension trait for adding context to foreign errors.
pub trait Context<T> {
    fn context(self, msg: impl Into<String>) -> TrestleResult<T>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> TrestleResult<T> {
        self.map_err(|e| TrestleError::Internal {
            message: format!("{}: {}", msg.into(), e),
        })
    }
}
