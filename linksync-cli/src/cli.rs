use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "linksync",
    about = "linksync - game ↔ chat platform sync operator tool",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Validate a config file and show the normalized sync pairs")]
    Check {
        #[arg(help = "Path to the JSON config file")]
        config: PathBuf,

        #[arg(short, long, help = "Output the normalized config as JSON")]
        json: bool,
    },

    #[command(about = "Run a ban sync against in-memory backends")]
    Simulate {
        #[arg(short, long, help = "Config file to take the ban pair from")]
        config: Option<PathBuf>,

        #[arg(long, default_value = "cheating", help = "Reason of the game-side ban")]
        reason: String,

        #[arg(short, long, help = "Output the resync summary as JSON")]
        json: bool,
    },
}
