//! Error handling for the Trestle CLI.
//!
//! Provides structured errors with:
//! - User-friendly messages
//! - Actionable suggestions
//! - Proper error chaining
//! - Exit code mapping, including mirroring a dispatched child's own code

use std::error::Error;

use owo_colors::OwoColorize;
use thiserror::Error;

use trestle_core::application::ApplicationError;
use trestle_core::error::TrestleError;

// Re-export so callers only need `use crate::error::*`.
pub use trestle_core::error::ErrorCategory as CoreCategory;

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Exit code used when a child was killed by the opt-in timeout.
pub const TIMEOUT_EXIT_CODE: u8 = 124;

/// CLI error types.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input that clap could not catch.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A configuration file or value could not be read or understood.
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The host environment cannot run Trestle at all.
    #[error("Environment error: {message}")]
    EnvironmentError { message: String },

    /// An error propagated from `trestle-core` or an adapter.
    #[error("{0}")]
    Core(#[from] TrestleError),

    /// An I/O operation failed.
    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::IoError {
            message: err.to_string(),
            source: err,
        }
    }
}

impl CliError {
    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidInput { message, .. } => vec![
                format!("Check your input: {message}"),
                "Use --help for usage information".into(),
            ],

            Self::ConfigError { .. } => {
                let mut suggestions = vec!["Check the TRESTLE_* environment variables".to_string()];
                if let Some(path) = crate::config::AppConfig::config_path() {
                    suggestions.push(format!("Check your config file at {}", path.display()));
                }
                suggestions
                    .push("Run 'trestle config list' to see the effective configuration".into());
                suggestions
            }

            Self::EnvironmentError { .. } => vec![
                "Set TRESTLE_HOME to a writable directory".into(),
                "Or make sure $HOME points to an existing directory".into(),
            ],

            Self::Core(core) => core.suggestions(),

            Self::IoError { message, .. } => vec![
                format!("I/O operation failed: {message}"),
                "Check file permissions".into(),
            ],
        }
    }

    /// Get the error category for styling and exit codes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. } => ErrorCategory::UserError,
            Self::ConfigError { .. } => ErrorCategory::Configuration,
            Self::EnvironmentError { .. } => ErrorCategory::Environment,
            Self::IoError { .. } => ErrorCategory::Internal,
            Self::Core(core) => match core.category() {
                CoreCategory::Validation => ErrorCategory::UserError,
                CoreCategory::NotFound => ErrorCategory::NotFound,
                CoreCategory::Environment => ErrorCategory::Environment,
                CoreCategory::Configuration => ErrorCategory::Configuration,
                CoreCategory::CommandFailed => ErrorCategory::CommandFailed,
                CoreCategory::Internal => ErrorCategory::Internal,
            },
        }
    }

    /// Exit code to pass to the OS.
    ///
    /// | Category       | Code                        |
    /// |----------------|-----------------------------|
    /// | User error     |  2                          |
    /// | Not found      |  3                          |
    /// | Configuration  |  4                          |
    /// | Environment    |  4                          |
    /// | Command failed | child's code, 128+signal, 124 on timeout |
    /// | Internal       |  1                          |
    pub fn exit_code(&self) -> u8 {
        match self.category() {
            ErrorCategory::UserError => 2,
            ErrorCategory::NotFound => 3,
            ErrorCategory::Configuration | ErrorCategory::Environment => 4,
            ErrorCategory::CommandFailed => self.child_exit_code(),
            ErrorCategory::Internal => 1,
        }
    }

    fn child_exit_code(&self) -> u8 {
        let Self::Core(TrestleError::Application(app)) = self else {
            return 1;
        };
        match app {
            ApplicationError::NonZeroExit { code } => {
                u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1)
            }
            ApplicationError::ChildTerminated { signal: Some(signal) } => {
                u8::try_from(128 + signal).unwrap_or(1)
            }
            ApplicationError::ChildTimedOut { .. } => TIMEOUT_EXIT_CODE,
            _ => 1,
        }
    }

    /// A failed child already reported its own failure on the inherited
    /// stderr, so only a one-line summary is printed for it.
    pub fn is_child_failure(&self) -> bool {
        self.category() == ErrorCategory::CommandFailed
    }

    /// Format the error for display with colors and suggestions.
    pub fn format_colored(&self, verbose: bool) -> String {
        let mut output = String::new();

        if self.is_child_failure() {
            output.push_str(&format!("{} {}\n", "\u{2717}".red().bold(), self.to_string().red()));
            return output;
        }

        output.push_str(&format!("\n{} {}\n\n", "\u{2717}".red().bold(), "Error:".red().bold()));
        output.push_str(&format!("  {}\n", self.to_string().red()));

        if verbose {
            let mut source = self.source();
            while let Some(err) = source {
                let arrow = "\u{2192}".dimmed();
                output.push_str(&format!("\n  {} {}\n", arrow, err.to_string().dimmed()));
                source = err.source();
            }
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str(&format!("\n{}\n", "Suggestions:".yellow().bold()));
            for suggestion in suggestions {
                output.push_str(&format!("  {suggestion}\n"));
            }
        }

        if !verbose {
            output.push('\n');
            output.push_str(&format!(
                "{} {}\n",
                "\u{2139}".blue(),
                "Use -d / --debug for more details.".dimmed(),
            ));
        }

        output
    }

    /// Plain-text version of [`Self::format_colored`]; no ANSI codes.
    pub fn format_plain(&self, verbose: bool) -> String {
        if self.is_child_failure() {
            return format!("Error: {self}\n");
        }

        let mut out = String::new();
        out.push_str(&format!("\nError: {self}\n"));

        if verbose {
            let mut src = self.source();
            while let Some(err) = src {
                out.push_str(&format!("  Caused by: {err}\n"));
                src = err.source();
            }
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\nSuggestions:\n");
            for s in &suggestions {
                out.push_str(&format!("  {s}\n"));
            }
        }

        if !verbose {
            out.push_str("\nUse -d / --debug for more details.\n");
        }

        out
    }

    /// Log the error using tracing.
    pub fn log(&self) {
        // The formatted message is printed by the caller; this is trace only.
        match self.category() {
            ErrorCategory::UserError => tracing::debug!("User error: {}", self),
            ErrorCategory::NotFound => tracing::debug!("Not found: {}", self),
            ErrorCategory::CommandFailed => tracing::debug!("Command failed: {}", self),
            ErrorCategory::Configuration => tracing::debug!("Configuration error: {}", self),
            ErrorCategory::Environment => tracing::debug!("Environment error: {}", self),
            ErrorCategory::Internal => tracing::debug!("Internal error: {}", self),
        }

        if let Some(source) = self.source() {
            tracing::debug!("Caused by: {}", source);
        }
    }
}

/// Error categories for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// User input error (validation, invalid arguments).
    UserError,
    /// Unknown command, unpublished package, missing entry point.
    NotFound,
    /// Configuration error.
    Configuration,
    /// Missing home directory, unsupported runtime.
    Environment,
    /// The dispatched command ran and failed.
    CommandFailed,
    /// Internal/system error.
    Internal,
}

// ── IntoCli trait ─────────────────────────────────────────────────────────────

/// Extension trait to convert foreign error types into [`CliError`] at
/// call-sites with a descriptive context message.
pub trait IntoCli<T> {
    /// Convert to `CliResult` attaching a human-readable context message.
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IntoCli<T> for Result<T, std::io::Error> {
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| CliError::IoError {
            message: f().into(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;
    use std::io;
    use std::path::PathBuf;
    use trestle_core::domain::DomainError;

    fn app(err: ApplicationError) -> CliError {
        CliError::Core(err.into())
    }

    // ── exit codes ────────────────────────────────────────────────────────

    #[test]
    fn child_exit_code_is_mirrored() {
        assert_eq!(app(ApplicationError::NonZeroExit { code: 1 }).exit_code(), 1);
        assert_eq!(app(ApplicationError::NonZeroExit { code: 42 }).exit_code(), 42);
    }

    #[test]
    fn out_of_range_child_code_falls_back_to_one() {
        assert_eq!(app(ApplicationError::NonZeroExit { code: -1 }).exit_code(), 1);
        assert_eq!(app(ApplicationError::NonZeroExit { code: 256 }).exit_code(), 1);
    }

    #[test]
    fn signal_and_timeout_codes() {
        assert_eq!(app(ApplicationError::ChildTerminated { signal: Some(9) }).exit_code(), 137);
        assert_eq!(app(ApplicationError::ChildTerminated { signal: None }).exit_code(), 1);
        assert_eq!(app(ApplicationError::ChildTimedOut { seconds: 5 }).exit_code(), 124);
    }

    #[test]
    fn unknown_command_is_not_found() {
        let err = app(ApplicationError::UnknownCommand {
            name: "frobnicate".into(),
            available: vec!["init".into()],
        });
        assert_eq!(err.exit_code(), 3);
        assert!(err.suggestions().iter().any(|s| s.contains("init")));
    }

    #[test]
    fn domain_errors_are_user_errors() {
        let err = CliError::Core(DomainError::InvalidInvocation("empty".into()).into());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn environment_and_config_exit_four() {
        let env = CliError::EnvironmentError { message: "no home".into() };
        let runtime = app(ApplicationError::UnsupportedRuntime {
            found: Version::new(10, 0, 0),
            minimum: Version::new(12, 0, 0),
        });
        let config = CliError::ConfigError {
            message: "x".into(),
            source: None,
        };
        assert_eq!(env.exit_code(), 4);
        assert_eq!(runtime.exit_code(), 4);
        assert_eq!(config.exit_code(), 4);
    }

    #[test]
    fn install_and_io_are_internal() {
        let install = app(ApplicationError::Install {
            package: "init".into(),
            version: Version::new(1, 0, 0),
            reason: "offline".into(),
        });
        let io = CliError::IoError {
            message: "x".into(),
            source: io::Error::other("e"),
        };
        assert_eq!(install.exit_code(), 1);
        assert_eq!(io.exit_code(), 1);
    }

    #[test]
    fn entry_missing_is_not_found() {
        let err = app(ApplicationError::EntryMissing {
            package: "init".into(),
            root: PathBuf::from("/cache/init@1.0.0"),
        });
        assert_eq!(err.exit_code(), 3);
    }

    // ── format ────────────────────────────────────────────────────────────

    #[test]
    fn format_plain_contains_error_header() {
        let err = CliError::EnvironmentError { message: "no home".into() };
        let s = err.format_plain(false);
        assert!(s.contains("Error:"));
        assert!(s.contains("Suggestions:"));
        assert!(s.contains("--debug"));
    }

    #[test]
    fn format_plain_verbose_shows_chain() {
        let err = CliError::ConfigError {
            message: "bad file".into(),
            source: Some(Box::new(io::Error::other("permission denied"))),
        };
        let s = err.format_plain(true);
        assert!(s.contains("Caused by: permission denied"));
        assert!(!s.contains("--debug"));
    }

    #[test]
    fn child_failure_prints_one_line() {
        let s = app(ApplicationError::NonZeroExit { code: 2 }).format_plain(false);
        assert_eq!(s.lines().count(), 1);
        assert!(!s.contains("Suggestions"));
    }

    // ── IntoCli ───────────────────────────────────────────────────────────

    #[test]
    fn into_cli_io_error() {
        let result: Result<(), io::Error> = Err(io::Error::new(io::ErrorKind::NotFound, "missing"));
        let cli: CliResult<()> = result.with_cli_context(|| "reading cwd");
        assert!(matches!(
            cli,
            Err(CliError::IoError { ref message, .. }) if message == "reading cwd"
        ));
    }
}
