//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Runwaiter - serialized configuration-management run coordinator
#[derive(Parser)]
#[command(
    name = "runwaiter",
    about = "Serializes configuration-management client runs on a single node",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the coordinator in the foreground (the default)
    Run,

    /// Load and print the effective configuration, then exit
    CheckConfig,
}
