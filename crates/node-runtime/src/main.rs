//! Courier node entry point.

use anyhow::{Context, Result};
use node_runtime::{NodeConfig, NodeRuntime};
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => NodeConfig::from_file(Path::new(&path))
            .with_context(|| format!("loading configuration from {path}"))?,
        None => NodeConfig::default(),
    };
    config.apply_env_overrides();
    config.validate().context("validating configuration")?;

    let runtime = NodeRuntime::new(config)?;
    runtime.start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutdown signal received");
    runtime.stop().await;

    Ok(())
}
