//! lastseen-logger
//!
//! Subscribes to MQTT topic patterns and records when each topic was last
//! heard from.

use anyhow::{Context, Result};
use clap::Parser;
use lastseen_cli::{setup_logging, watch_for_shutdown, LogTarget, LoggerArgs, MqttSource};
use lastseen_core::SystemClock;
use lastseen_ingest::{IngestMode, Ingestor};
use lastseen_store::Store;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = LoggerArgs::parse();
    setup_logging(args.log_level(), LogTarget::Stdout)?;

    let config = args.into_config();
    config.validate().context("Invalid configuration")?;

    let mode = config.mode();
    match mode {
        IngestMode::Immediate => info!("Committing every arrival immediately"),
        IngestMode::Batched { interval } => {
            info!(interval_secs = interval.as_secs_f64(), "Committing arrivals in batches")
        }
    }

    let store = Store::open(&config.database)
        .with_context(|| format!("Cannot open database {}", config.database.display()))?;
    let ingestor = Ingestor::new(Arc::new(store), mode, config.retention, Arc::new(SystemClock))
        .context("Cannot load recorded topics")?;

    let shutdown_rx = watch_for_shutdown(tokio::signal::ctrl_c());

    let mut source = MqttSource::connect(&config.bus, config.topics.clone(), shutdown_rx)
        .await
        .context("Cannot connect to MQTT broker")?;
    info!(patterns = config.topics.len(), "Listening for messages");

    let stats = ingestor.run(&mut source).await?;
    info!(
        received = stats.received,
        failed = stats.failed,
        "Logger stopped"
    );

    Ok(())
}
