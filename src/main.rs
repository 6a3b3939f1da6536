//! tiobench harness - correctness checks for the tio server under load
//!
//! Runs the tiobench stress scenarios against a freshly started tio server
//! and verifies the container state they leave behind.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use tiobench_harness::common::logging;
use tiobench_harness::{cli, commands};

#[derive(Parser)]
#[command(name = "tiobench-harness", about = "Verify tio container state after tiobench runs")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: config.toml in the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging and driver output for passing scenarios
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.verbose);

    let options = cli::Options {
        config: cli.config,
        verbose: cli.verbose,
    };

    if let Err(e) = cli::dispatch(cli.command, options).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
