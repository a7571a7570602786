// ============================================================================
// domain/error.rs - DOMAIN ERRORS
// ============================================================================

use thiserror::Error;

/// Root domain error type.
///
/// Raised only by pure value construction and parsing; nothing in the
/// domain layer touches the filesystem, the registry or child processes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    #[error("Invalid package name '{name}': {reason}")]
    InvalidPackageName { name: String, reason: String },

    #[error("Invalid version request '{request}': {reason}")]
    InvalidVersionRequest { request: String, reason: String },

    #[error("Invalid command binding '{spec}': {reason}")]
    InvalidBinding { spec: String, reason: String },

    #[error("Invalid invocation: {0}")]
    InvalidInvocation(String),

    // ========================================================================
    // Cache addressing
    // ========================================================================
    #[error("'{key}' is not a cache key")]
    InvalidCacheKey { key: String },
}

impl DomainError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidPackageName { name, .. } => vec![
                format!("'{}' cannot be used as a package name", name),
                "Package names look like 'name' or '@scope/name'".into(),
            ],
            Self::InvalidVersionRequest { .. } => vec![
                "Use 'latest', an exact version (1.2.0) or a range (^1.2, >=1.0, <2)".into(),
            ],
            Self::InvalidBinding { .. } => vec![
                "Bindings look like 'package' or 'package@version-request'".into(),
                "Example: deploy = \"@acme/deploy@^2\"".into(),
            ],
            Self::InvalidInvocation(_) => vec!["Use --help for usage information".into()],
            Self::InvalidCacheKey { .. } => vec![
                "The cache directory contains an unexpected entry".into(),
                "Run 'trestle cache clean' to reset it".into(),
            ],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidCacheKey { .. } => ErrorCategory::Internal,
            _ => ErrorCategory::Validation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Internal,
}
