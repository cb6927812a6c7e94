//! linksync operator tool
//!
//! Validates sync configs and runs dry reconciliations against in-memory
//! backends. Production hosts embed `linksync-core` directly.

#![allow(clippy::print_stdout, reason = "CLI tool outputs to stdout")]

use anyhow::Result;
use clap::Parser;

mod check_commands;
mod cli;
mod simulate_commands;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    linksync_core::init_logger(&cli.log_level)
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {e}"))?;

    match cli.command {
        Commands::Check { config, json } => check_commands::check_config(&config, json),
        Commands::Simulate { config, reason, json } => {
            simulate_commands::simulate_ban(config.as_deref(), &reason, json).await
        },
    }
}
