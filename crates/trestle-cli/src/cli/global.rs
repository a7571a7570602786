//! Global arguments that apply to every subcommand.
//!
//! Declared here and flattened into [`super::Cli`] so that `-v`, `-q`,
//! `--target-path` etc. are available on any invocation without repetition.

use clap::{Args, builder::FalseyValueParser};
use std::path::PathBuf;

/// Global arguments for all commands.
#[derive(Debug, Args, Default)]
pub struct GlobalArgs {
    /// Increase logging verbosity.
    ///
    /// Pass once for INFO (`-v`), twice for DEBUG (`-vv`), three times for
    /// TRACE (`-vvv`).  Conflicts with `--quiet`.
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase verbosity (-v, -vv, -vvv)",
        long_help = "Increase logging verbosity:
    (none)  - Only warnings and errors
    -v      - Info level (progress messages)
    -vv     - Debug level (dispatch state transitions)
    -vvv    - Trace level (very verbose)"
    )]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        conflicts_with_all = ["verbose", "debug"],
        help = "Suppress non-error output"
    )]
    pub quiet: bool,

    /// Debug mode: debug-level logs and full error chains.
    #[arg(
        short = 'd',
        long = "debug",
        global = true,
        env = "TRESTLE_DEBUG",
        value_parser = FalseyValueParser::new(),
        help = "Enable debug mode (detailed logs and error chains)"
    )]
    pub debug: bool,

    /// Disable ANSI colour codes.
    ///
    /// Automatically honoured when `NO_COLOR` is set in the environment
    /// (see <https://no-color.org>).
    #[arg(
        long = "no-color",
        global = true,
        env = "NO_COLOR",
        value_parser = FalseyValueParser::new(),
        help = "Disable colored output"
    )]
    pub no_color: bool,

    /// Configuration file path.
    #[arg(
        short = 'c',
        long = "config",
        global = true,
        value_name = "FILE",
        help = "Configuration file path"
    )]
    pub config: Option<PathBuf>,

    /// Run the command's package from this directory instead of the cache.
    #[arg(
        long = "target-path",
        global = true,
        value_name = "DIR",
        env = "TRESTLE_TARGET_PATH",
        help = "Run the package found at DIR (no caching, no updates)"
    )]
    pub target_path: Option<PathBuf>,

    /// Pin the dispatched package's version.
    #[arg(
        long = "package-version",
        global = true,
        value_name = "REQ",
        help = "Version or range of the dispatched package (disables updates)"
    )]
    pub package_version: Option<String>,

    /// Machine-readable output format.
    #[arg(
        long = "output-format",
        global = true,
        value_enum,
        default_value = "auto",
        help = "Output format"
    )]
    pub output_format: OutputFormat,
}

/// How the CLI should render its output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Auto-detect based on terminal.
    #[default]
    Auto,
    /// Human-readable with colors.
    Human,
    /// Plain text without colors.
    Plain,
    /// JSON output.
    Json,
}
