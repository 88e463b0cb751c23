//! rcprobe - connectivity probe for S3/OSS-compatible object storage
//!
//! Runs a single download or upload against a storage endpoint, writes a log
//! of what happened, and tells endpoint problems from local network problems.

mod commands;
mod exit_code;
mod output;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    let exit_code = runtime.block_on(commands::execute(cli));
    drop(runtime);

    std::process::exit(exit_code.as_i32());
}

/// Logs go to stderr so stdout stays clean for `--json`
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("rcprobe=debug,rcprobe_core=debug,rcprobe_s3=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .init();
}
