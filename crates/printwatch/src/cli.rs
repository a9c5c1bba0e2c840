//! Clap derive structures for the `printwatch` CLI.
//!
//! Defines the command tree, global flags, and shared output enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// printwatch -- fleet status monitor for hobbyist 3D printers
#[derive(Debug, Parser)]
#[command(
    name = "printwatch",
    version,
    about = "Monitor a fleet of Moonraker, OctoPrint, and Elegoo SDCP printers",
    long_about = "Watches every printer in a TOML fleet file and keeps one\n\
        normalized status record per device: state, job progress, ETA, and\n\
        temperatures, whatever protocol the controller speaks.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Fleet file path (defaults to the platform config directory)
    #[arg(
        long,
        short = 'c',
        env = "PRINTWATCH_CONFIG",
        value_name = "PATH",
        global = true
    )]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PRINTWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the fleet monitor until interrupted
    Run,

    /// Poll every enabled printer once and print the fleet status
    #[command(alias = "status")]
    Poll,

    /// Write a starter fleet file
    Init(InitArgs),
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing fleet file
    #[arg(long)]
    pub force: bool,
}
