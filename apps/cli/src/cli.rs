use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Region-aware HTTP latency monitor
#[derive(Debug, Parser)]
#[command(name = "pingwatch", version, about)]
pub struct Cli {
    /// Path to the config file (created with defaults if missing)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Probe the active region until interrupted
    Run(RunArgs),
    /// List the known regions and their endpoints
    Regions,
    /// Print the effective configuration
    Config,
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Region to probe (NA, EUW, EUNE, KR, JP)
    #[arg(short, long)]
    pub region: Option<String>,

    /// Seconds between rounds
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Stop after this many rounds
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub rounds: Option<u64>,

    /// Print one JSON report per round instead of the console report
    #[arg(long)]
    pub json: bool,

    /// Export a snapshot on exit, optionally to the given file
    #[arg(long, num_args = 0..=1, value_name = "PATH")]
    pub export: Option<Option<PathBuf>>,

    /// Apply the configured network priority commands while running
    #[arg(long)]
    pub priority: bool,
}
