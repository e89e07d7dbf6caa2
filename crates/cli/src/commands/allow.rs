// Path: crates/cli/src/commands/allow.rs
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use hearth_stats::store::StatsStore;
use hearth_types::config::RelayConfig;

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ListDirection {
    Read,
    Write,
}

#[derive(Args, Debug)]
pub struct AllowArgs {
    /// Path to the relay's TOML configuration file.
    #[clap(long, default_value = "./hearth.toml")]
    config: PathBuf,

    /// Which allow-list to mutate.
    #[clap(long, value_enum)]
    direction: ListDirection,

    /// Hex or npub-encoded public key to add.
    #[clap(long)]
    pubkey: String,

    /// Tier name to grant, if the relay is running in subscription mode.
    #[clap(long)]
    tier: Option<String>,
}

#[derive(Args, Debug)]
pub struct DenyArgs {
    #[clap(long, default_value = "./hearth.toml")]
    config: PathBuf,

    #[clap(long, value_enum)]
    direction: ListDirection,

    #[clap(long)]
    pubkey: String,
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub async fn run_allow(args: AllowArgs) -> Result<()> {
    let config = RelayConfig::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    let canon = hearth_crypto::pubkey::canonicalize(&args.pubkey)
        .with_context(|| format!("invalid pubkey: {}", args.pubkey))?;
    let pubkey_hex = hex::encode(canon);
    let stats = StatsStore::open(&config.stats_db_path)
        .with_context(|| format!("opening stats store at {}", config.stats_db_path))?;

    match args.direction {
        ListDirection::Read => {
            stats
                .add_allowed_read(&pubkey_hex, args.tier.as_deref(), "hearth-cli", now_unix())
                .await
                .context("adding to read allow-list")?;
        }
        ListDirection::Write => {
            stats
                .add_allowed_write(&pubkey_hex, args.tier.as_deref(), "hearth-cli", now_unix())
                .await
                .context("adding to write allow-list")?;
        }
    }

    println!("allowed {pubkey_hex} for {:?}", args.direction);
    Ok(())
}

pub async fn run_deny(args: DenyArgs) -> Result<()> {
    let config = RelayConfig::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    let canon = hearth_crypto::pubkey::canonicalize(&args.pubkey)
        .with_context(|| format!("invalid pubkey: {}", args.pubkey))?;
    let pubkey_hex = hex::encode(canon);
    let stats = StatsStore::open(&config.stats_db_path)
        .with_context(|| format!("opening stats store at {}", config.stats_db_path))?;

    match args.direction {
        ListDirection::Read => {
            stats
                .remove_allowed_read(&pubkey_hex)
                .await
                .context("removing from read allow-list")?;
        }
        ListDirection::Write => {
            stats
                .remove_allowed_write(&pubkey_hex)
                .await
                .context("removing from write allow-list")?;
        }
    }

    println!("denied {pubkey_hex} for {:?}", args.direction);
    Ok(())
}
