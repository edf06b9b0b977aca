//! # Basalt Node
//!
//! Entry point for the permissioned proof-of-stake node: loads
//! configuration from the environment, assembles genesis, and brings up
//! the storage, state, and consensus-dispatch substrate.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use basalt_node::container::{NodeConfig, SubsystemContainer};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("===========================================");
    info!("  Basalt Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let config = NodeConfig::from_env()?;
    info!(
        network = %config.network,
        chain_id = config.chain_id,
        mode = ?config.mode,
        p2p_port = config.p2p_port,
        http_port = config.http_port,
        "loaded configuration"
    );

    let container = SubsystemContainer::new(config)?;
    info!(
        state_root = %hex::encode(container.genesis.header.state_root),
        "node initialized"
    );

    info!("node is running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down gracefully");

    Ok(())
}
