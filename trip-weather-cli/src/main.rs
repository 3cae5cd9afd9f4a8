//! Binary crate for the `trip-weather` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Loading configuration and setting up the logging context
//! - Printing the report

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
