//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: drive a simulated host through start/stop cycles
//! - config: print the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// loadcycle - exercise a load coordinator through host lifecycle cycles
#[derive(Parser, Debug)]
#[command(name = "loadcycle")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the lifecycle simulation
    Run {
        /// Number of start/stop cycles
        #[arg(short = 'n', long)]
        cycles: Option<u32>,

        /// Simulated load time in milliseconds
        #[arg(short, long)]
        delay_ms: Option<u64>,

        /// Time the host stays started in each cycle, in milliseconds
        #[arg(short, long)]
        pause_ms: Option<u64>,

        /// Make the worker ignore cancellation requests
        #[arg(long)]
        ignore_cancel: bool,
    },

    /// Print the effective configuration as YAML
    Config,
}
