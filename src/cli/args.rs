//! CLI argument definitions.
//!
//! All Clap derive structs for `DriftJack` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

/// Controlled GPS-spoofing attack simulator.
#[derive(Parser, Debug)]
#[command(name = "driftjack", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "DRIFTJACK_COLOR")]
    pub color: ColorChoice,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP control surface.
    Serve(ServeArgs),

    /// Validate a configuration file without starting the server.
    Validate(ValidateArgs),

    /// Display version information.
    Version,
}

/// Arguments for `serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to YAML configuration file (defaults apply when omitted).
    #[arg(short, long, env = "DRIFTJACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bind address override, `host:port`.
    #[arg(long, env = "DRIFTJACK_BIND")]
    pub bind: Option<String>,

    /// Emit logs as newline-delimited JSON.
    #[arg(long)]
    pub log_json: bool,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration file to validate.
    pub config: PathBuf,
}

/// Color output control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Colors when stderr is a terminal and `NO_COLOR` is unset.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}
