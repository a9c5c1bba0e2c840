//! CLI error types with miette diagnostics.
//!
//! Wraps config and registry errors with actionable help text and maps
//! every variant to a process exit code.

use miette::Diagnostic;
use thiserror::Error;

/// Exit codes for process termination. `USAGE` is what clap itself
/// exits with on argument errors; it is listed here for completeness.
#[allow(dead_code)]
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Fleet file ───────────────────────────────────────────────────
    #[error("no fleet file at {path}")]
    #[diagnostic(
        code(printwatch::no_fleet_file),
        help("Create one with: printwatch init\nOr point at one with --config / PRINTWATCH_CONFIG.")
    )]
    NoFleetFile { path: String },

    #[error("fleet file already exists at {path}")]
    #[diagnostic(
        code(printwatch::fleet_file_exists),
        help("Pass --force to overwrite it.")
    )]
    FleetFileExists { path: String },

    #[error(transparent)]
    #[diagnostic(
        code(printwatch::config),
        help("Fix the fleet file and try again; `printwatch init --force` rewrites the template.")
    )]
    Config(#[from] printwatch_config::ConfigError),

    #[error(transparent)]
    #[diagnostic(code(printwatch::registry))]
    Registry(#[from] printwatch_core::RegistryError),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoFleetFile { .. }
            | Self::FleetFileExists { .. }
            | Self::Config(_)
            | Self::Registry(_) => exit_code::CONFIG,
            Self::Io(_) => exit_code::GENERAL,
        }
    }
}
