//! CLI command definitions
//!
//! Each subcommand lives in its own module and returns an [`ExitCode`].

mod probe;

use clap::{Parser, Subcommand};

use crate::exit_code::ExitCode;
use crate::output::OutputConfig;

/// rcprobe - connectivity probe for S3/OSS-compatible object storage
#[derive(Parser, Debug)]
#[command(name = "rcprobe", version, about, long_about = None)]
pub struct Cli {
    /// Output results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print debug logs to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe an endpoint with one download or upload and diagnose failures
    Probe(probe::ProbeArgs),
}

/// Execute the parsed command
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Probe(args) => probe::execute(args, output_config).await,
    }
}
