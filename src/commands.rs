//! CLI command definitions
//!
//! Defines the clap commands for the harness CLI.

use clap::Subcommand;
use std::path::PathBuf;

use crate::testing::Scenario;

#[derive(Subcommand)]
pub enum Commands {
    /// Run scenarios against the configured tio and tiobench
    Run {
        /// Scenario to run; can be repeated (default: all, in order)
        #[arg(long, short, value_enum)]
        scenario: Vec<Scenario>,
    },

    /// Show the resolved configuration
    Config {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the record count of containers on a running server
    Count {
        /// Full container names, e.g. intelimarket/bvmf/PETR4/book_buy
        #[arg(required = true)]
        containers: Vec<String>,

        /// Server to ask (default: the configured URI)
        #[arg(long)]
        uri: Option<String>,
    },

    /// Parse a saved tiobench report
    Parse {
        /// File holding the captured driver output
        file: PathBuf,

        /// Extract the symbol list instead of the map report
        #[arg(long)]
        symbols: bool,
    },
}
