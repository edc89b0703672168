use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use kafka_broker_lite::config::{Cli, Config};
use kafka_broker_lite::metadata::ClusterMetadata;
use kafka_broker_lite::server;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config: Config = Cli::parse().into();

    let metadata = ClusterMetadata::load(&config.log_dir).context("load cluster metadata")?;
    tracing::info!(log_dir = %config.log_dir.display(), "cluster metadata loaded");

    server::run(config, Arc::new(metadata)).await
}
