//! Reclaim CLI Binary
//!
//! Command-line interface for canvas server asset recovery.

use clap::Parser;
use reclaim::tooling::cli::{execute, Cli};
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    execute(cli).await?;
    Ok(())
}
