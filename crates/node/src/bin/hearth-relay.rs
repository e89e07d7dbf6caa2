// Path: crates/node/src/bin/hearth-relay.rs
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use hearth_node::Runtime;
use hearth_types::config::RelayConfig;

#[derive(Parser, Debug)]
#[clap(name = "hearth-relay", about = "Nostr relay core (event ingestion, access control, content filtering)")]
struct Opts {
    /// Path to the relay's TOML configuration file.
    #[clap(long, default_value = "./hearth.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    hearth_telemetry::init_tracing()?;

    let opts = Opts::parse();
    let mut config = RelayConfig::load(&opts.config)
        .with_context(|| format!("loading config from {}", opts.config.display()))?;

    if config.relay.private_key.is_none() {
        println!("No relay.private_key configured; generating one and persisting it back.");
        let generated = hearth_crypto::relay_key::RelayKeypair::generate();
        config.relay.private_key = Some(generated.secret_hex());
        config.relay.public_key = Some(hex::encode(generated.public_key));
        let serialized = toml::to_string_pretty(&config).context("re-serializing config")?;
        fs::write(&opts.config, serialized)
            .with_context(|| format!("writing generated key back to {}", opts.config.display()))?;
    }

    let runtime = Runtime::bootstrap(config)?;
    println!(
        "hearth-relay ready: {} (nips {:?})",
        runtime.config.relay.name, runtime.config.relay.supported_nips
    );
    println!(
        "relay pubkey: {}",
        hex::encode(runtime.relay_keypair.public_key)
    );

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
        }
    }

    Ok(())
}
