//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Gantry - module and target build configuration for C++ projects
#[derive(Parser)]
#[command(name = "gantry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to Gantry.toml (defaults to searching upward from the current directory)
    #[arg(long, global = true, env = "GANTRY_MANIFEST_PATH")]
    pub manifest_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the manifest and print the build plan
    Plan(PlanArgs),

    /// Validate the manifest without printing a plan
    Check(CheckArgs),

    /// Show the compile order, or a target's link order
    Order(OrderArgs),

    /// Show the effective settings of a module
    Flags(FlagsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct PlanArgs {
    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,

    /// Treat warnings as errors
    #[arg(long)]
    pub deny_warnings: bool,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Treat warnings as errors
    #[arg(long)]
    pub deny_warnings: bool,
}

#[derive(Args)]
pub struct OrderArgs {
    /// Show the link order of this target instead of the global compile order
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct FlagsArgs {
    /// Module to show settings for
    pub module: String,

    /// Apply this target's overrides
    #[arg(short, long)]
    pub target: Option<String>,

    /// Hide which module each value came from
    #[arg(long)]
    pub no_provenance: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
