//! Binary crate for the `owm-check` command-line tool.
//!
//! This crate focuses on:
//! - Loading configuration from the config file, `.env` and the environment
//! - Interactive configuration
//! - Running the live conformance suite and reporting per-case results

use clap::Parser;

mod cli;
mod logging;
mod runner;
mod suite;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
