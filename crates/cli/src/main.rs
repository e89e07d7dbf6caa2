// Path: crates/cli/src/main.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # hearth-cli
//!
//! Admin interface for the relay's allow-lists and usage statistics.
//! Relay keypair generation lives in `hearth-relay` itself; this tool only
//! ever touches the statistics database.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::allow::{self, AllowArgs, DenyArgs};
use commands::stats::{self, StatsArgs};

#[derive(Parser, Debug)]
#[clap(
    name = "hearth-cli",
    version,
    about = "Admin tools for a running hearth relay's allow-lists and usage statistics."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a pubkey to the read or write allow-list.
    Allow(AllowArgs),

    /// Remove a pubkey from the read or write allow-list.
    Deny(DenyArgs),

    /// Print a usage summary by author, kind, or month.
    Stats(StatsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Allow(args) => allow::run_allow(args).await,
        Commands::Deny(args) => allow::run_deny(args).await,
        Commands::Stats(args) => stats::run(args).await,
    }
}
