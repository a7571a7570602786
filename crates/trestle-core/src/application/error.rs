//! Application layer errors.
//!
//! These carry the dispatch failure taxonomy. Every variant is fatal to the
//! current dispatch and none is retried automatically; retrying is left to
//! the person re-running the tool.

use std::path::PathBuf;

use semver::Version;
use thiserror::Error;

use crate::error::ErrorCategory;

/// Errors that occur while orchestrating a dispatch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    /// The host environment cannot run dispatched commands.
    #[error("Environment error: {reason}")]
    Environment { reason: String },

    /// The runtime that executes entry points is too old.
    #[error("Runtime {found} is not supported, {minimum} or newer is required")]
    UnsupportedRuntime { found: Version, minimum: Version },

    /// No version satisfies the request (or the registry listed none).
    #[error("Cannot resolve {package}@{request}: {reason}")]
    Resolution {
        package: String,
        request: String,
        reason: String,
    },

    /// The registry could not be queried.
    #[error("Registry query for {package} failed: {reason}")]
    Registry { package: String, reason: String },

    /// The package manager failed to materialize a version.
    #[error("Failed to install {package}@{version}: {reason}")]
    Install {
        package: String,
        version: Version,
        reason: String,
    },

    /// The package is present but declares nothing runnable.
    #[error("Package {package} has no entry point under {}", root.display())]
    EntryMissing { package: String, root: PathBuf },

    /// The package manifest exists but cannot be read.
    #[error("Invalid package manifest {}: {reason}", path.display())]
    ManifestInvalid { path: PathBuf, reason: String },

    /// The command name has no package binding.
    #[error("Unknown command '{name}'")]
    UnknownCommand { name: String, available: Vec<String> },

    /// Direct mode was requested for a path that does not exist.
    #[error("Target path {} does not exist", path.display())]
    TargetMissing { path: PathBuf },

    /// The child process could not be started at all.
    #[error("Failed to start '{program}': {reason}")]
    Spawn { program: String, reason: String },

    /// The child ran and reported failure.
    #[error("Command exited with code {code}")]
    NonZeroExit { code: i32 },

    /// The child was killed before reporting an exit code.
    #[error("Command was terminated{}", by_signal(signal))]
    ChildTerminated { signal: Option<i32> },

    /// The opt-in child timeout elapsed.
    #[error("Command did not finish within {seconds}s and was killed")]
    ChildTimedOut { seconds: u64 },

    /// Filesystem operation failed.
    #[error("Filesystem error at {}: {reason}", path.display())]
    Filesystem { path: PathBuf, reason: String },
}

impl ApplicationError {
    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Environment { reason } => vec![
                format!("Environment check failed: {}", reason),
                "Make sure your home directory exists and is writable".into(),
            ],
            Self::UnsupportedRuntime { minimum, .. } => vec![
                format!("Install runtime version {} or newer", minimum),
                "Or point runtime.program at a newer installation".into(),
            ],
            Self::Resolution { package, .. } => vec![
                format!("Check that '{}' is published to the configured registry", package),
                "Check registry.url / registry.path in your configuration".into(),
            ],
            Self::Registry { .. } => vec![
                "Check your network connection and registry.url".into(),
            ],
            Self::Install { .. } => vec![
                "The package could not be fetched; nothing was written to the cache".into(),
                "Check your network connection and try again".into(),
            ],
            Self::EntryMissing { package, .. } => vec![
                format!("'{}' was fetched but its manifest declares no \"main\" entry", package),
                "Publish a version with a \"main\" field, or pin a different one".into(),
            ],
            Self::ManifestInvalid { path, .. } => vec![
                format!("Fix or remove {}", path.display()),
                "Run 'trestle cache clean' to discard cached copies".into(),
            ],
            Self::UnknownCommand { available, .. } => {
                let mut out = vec!["Use --help to see built-in commands".into()];
                if !available.is_empty() {
                    out.push(format!("Available commands: {}", available.join(", ")));
                }
                out
            }
            Self::TargetMissing { path } => vec![
                format!("Create {} or drop --target-path", path.display()),
            ],
            Self::Spawn { program, .. } => vec![
                format!("Ensure '{}' is installed and in your PATH", program),
                "Or set runtime.program in your configuration".into(),
            ],
            Self::ChildTimedOut { .. } => vec![
                "Raise runtime.timeout_secs, or unset it to wait indefinitely".into(),
            ],
            Self::Filesystem { path, .. } => vec![
                format!("Failed to access: {}", path.display()),
                "Check that you have write permissions".into(),
            ],
            Self::NonZeroExit { .. } | Self::ChildTerminated { .. } => vec![],
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Environment { .. } | Self::UnsupportedRuntime { .. } => {
                ErrorCategory::Environment
            }
            Self::UnknownCommand { .. }
            | Self::Resolution { .. }
            | Self::EntryMissing { .. }
            | Self::TargetMissing { .. } => ErrorCategory::NotFound,
            Self::NonZeroExit { .. }
            | Self::ChildTerminated { .. }
            | Self::ChildTimedOut { .. } => ErrorCategory::CommandFailed,
            Self::Registry { .. }
            | Self::Install { .. }
            | Self::Spawn { .. }
            | Self::ManifestInvalid { .. }
            | Self::Filesystem { .. } => {
                ErrorCategory::Internal
            }
        }
    }
}

fn by_signal(signal: &Option<i32>) -> String {
    signal.map(|s| format!(" by signal {s}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_and_entry_missing_are_distinct() {
        let install = ApplicationError::Install {
            package: "init".into(),
            version: Version::new(1, 0, 0),
            reason: "offline".into(),
        };
        let missing = ApplicationError::EntryMissing {
            package: "init".into(),
            root: PathBuf::from("/cache/init@1.0.0"),
        };
        assert_ne!(install.category(), missing.category());
        assert!(install.to_string().contains("Failed to install"));
        assert!(missing.to_string().contains("no entry point"));
    }

    #[test]
    fn spawn_and_nonzero_exit_are_distinct() {
        let spawn = ApplicationError::Spawn {
            program: "node".into(),
            reason: "not found".into(),
        };
        let exit = ApplicationError::NonZeroExit { code: 1 };
        assert_eq!(spawn.category(), ErrorCategory::Internal);
        assert_eq!(exit.category(), ErrorCategory::CommandFailed);
    }

    #[test]
    fn unknown_command_lists_available() {
        let err = ApplicationError::UnknownCommand {
            name: "frobnicate".into(),
            available: vec!["init".into()],
        };
        assert!(err.suggestions().iter().any(|s| s.contains("init")));
    }

    #[test]
    fn terminated_message_mentions_signal() {
        let err = ApplicationError::ChildTerminated { signal: Some(9) };
        assert_eq!(err.to_string(), "Command was terminated by signal 9");
        let err = ApplicationError::ChildTerminated { signal: None };
        assert_eq!(err.to_string(), "Command was terminated");
    }
}
