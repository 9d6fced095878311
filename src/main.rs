//! Result Monitor - follow algorithm result files from the command line
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;

use result_monitor::HeadlessOptions;
use rmon_core::logging;

/// Result Monitor - print a result file's events as NDJSON
#[derive(Parser, Debug)]
#[command(name = "rmon")]
#[command(about = "Follow algorithm result files as NDJSON", long_about = None)]
struct Args {
    /// Result file to open
    #[arg(value_name = "FILE")]
    file: String,

    /// Keep running and republish the file every time it changes
    #[arg(long)]
    watch: bool,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    // Logging is best effort; stdout carries the events either way
    if let Err(e) = logging::init() {
        eprintln!("Warning: file logging disabled: {}", e);
    }

    result_monitor::run_headless(HeadlessOptions {
        file: args.file,
        watch: args.watch,
        config_path: args.config,
    })
    .await?;

    Ok(())
}
