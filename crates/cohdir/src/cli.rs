//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "cohdir")]
#[command(about = "Coherence directory - replay sharer-tracking scenarios against a directory")]
#[command(version)]
pub struct Cli {
    /// Show metrics summary after execution
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Enable debug logging (adds a cohdir=debug filter directive)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Filter directive layered over `RUST_LOG` for the crate's own logs.
    #[must_use]
    pub const fn log_directive(&self) -> &'static str {
        if self.verbose {
            "cohdir=debug"
        } else if self.silent {
            "cohdir=error"
        } else {
            "cohdir=info"
        }
    }
}

/// Options shared by every command that builds a directory.
#[derive(clap::Args, Clone, Debug)]
pub struct ConfigArgs {
    /// Simulator configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// Override a configuration value (e.g. perf_model/dram_directory/max_hw_sharers=8)
    #[arg(long = "set", value_name = "PATH=VALUE")]
    pub overrides: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a script of directory operations
    Replay {
        #[command(flatten)]
        config: ConfigArgs,

        /// Script file, one operation per line
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },
    /// Validate the directory configuration and print its parameters
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },
}
