//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use clap::{Args, Parser, Subcommand};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name    = "trestle",
    bin_name = "trestle",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Scaffolding whose commands are versioned packages",
    long_about = "Trestle runs each command from a package fetched on demand. \
                  Packages are cached per version and updated when a newer \
                  release is published.",
    after_help = "EXAMPLES:\n\
        \x20 trestle init my-app\n\
        \x20 trestle init my-app --force --package-version 1.4.0\n\
        \x20 trestle init my-app --target-path ../init-checkout\n\
        \x20 trestle deploy site --env prod       # bound via [commands] in config\n\
        \x20 trestle cache clean @trestle/init",
    arg_required_else_help = true,
    subcommand_required    = true,
)]
pub struct Cli {
    /// Flags available on every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

// ── Subcommands ───────────────────────────────────────────────────────────────

/// All available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a new project with the init package.
    #[command(
        about = "Create a new project",
        after_help = "EXAMPLES:\n\
            \x20 trestle init\n\
            \x20 trestle init my-app\n\
            \x20 trestle init my-app --force"
    )]
    Init(InitArgs),

    /// List bound commands.
    #[command(
        visible_alias = "ls",
        about = "List commands and their cached versions",
        after_help = "EXAMPLES:\n\
            \x20 trestle list\n\
            \x20 trestle list --output-format json"
    )]
    List,

    /// Inspect or clear the package cache.
    #[command(about = "Package cache management", subcommand)]
    Cache(CacheCommands),

    /// Generate shell completion scripts.
    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n\
            \x20 trestle completions bash > ~/.local/share/bash-completion/completions/trestle\n\
            \x20 trestle completions zsh  > ~/.zfunc/_trestle\n\
            \x20 trestle completions fish > ~/.config/fish/completions/trestle.fish"
    )]
    Completions(CompletionsArgs),

    /// Inspect the Trestle configuration.
    #[command(
        about = "Configuration inspection",
        subcommand,
        after_help = "EXAMPLES:\n\
            \x20 trestle config get registry.url\n\
            \x20 trestle config list\n\
            \x20 trestle config path"
    )]
    Config(ConfigCommands),

    /// Any other command is looked up among the configured bindings.
    #[command(external_subcommand)]
    External(Vec<String>),
}

// ── init ──────────────────────────────────────────────────────────────────────

/// Arguments for `trestle init`.
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Name of the project to create.
    #[arg(value_name = "PROJECT_NAME", help = "Project name")]
    pub project_name: Option<String>,

    /// Let the init package overwrite existing files.
    #[arg(short = 'f', long = "force", help = "Overwrite existing files")]
    pub force: bool,
}

// ── cache ─────────────────────────────────────────────────────────────────────

/// Subcommands for `trestle cache`.
#[derive(Debug, Subcommand)]
pub enum CacheCommands {
    /// List cached package versions.
    List,
    /// Remove cached versions of one package, or of all packages.
    Clean {
        /// Package to remove, e.g. `@trestle/init`.
        #[arg(value_name = "PACKAGE")]
        package: Option<String>,
    },
}

// ── completions ───────────────────────────────────────────────────────────────

/// Arguments for `trestle completions`.
#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum, help = "Shell to generate completions for")]
    pub shell: clap_complete::Shell,
}

// ── config subcommands ────────────────────────────────────────────────────────

/// Subcommands for `trestle config`.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the value of a configuration key.
    Get {
        /// Dotted key path, e.g. `registry.url`.
        key: String,
    },
    /// Print the effective configuration.
    List,
    /// Print the path of the configuration file.
    Path,
}

// ── tests ─────────────────────────────────────────────────────────────────────
