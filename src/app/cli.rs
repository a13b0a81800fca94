//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// TrackPal - single-finger edge scrolling for precision trackpads
#[derive(Parser, Debug)]
#[command(name = "trackpal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file path (default: ~/.trackpal/settings.toml)
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the touch intent engine
    Run {
        /// Seconds to run (0 = until killed)
        #[arg(short, long, default_value = "0")]
        duration: u64,

        /// Write the recorded scroll sessions as JSON on exit
        #[arg(long)]
        dump_sessions: bool,
    },

    /// Check permissions, devices and settings
    Doctor,

    /// Inspect or initialize the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Settings file operations
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective settings
    Show,

    /// Write a settings file with default values
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the settings file path
    Path,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
