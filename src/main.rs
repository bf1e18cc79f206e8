//! Command-line interface for kafka-avro-pipeline
//!
//! ```bash
//! # Produce records, then wait for Ctrl+C
//! kafka-avro-pipeline --mode produce --brokers localhost:9092 --topic ucenter
//!
//! # Consume records with debug logging from the Kafka client
//! kafka-avro-pipeline --mode consume --group-id uct --verbose
//! ```

use anyhow::Context;
use avro_codec::Codec;
use clap::{CommandFactory, Parser};
use kafka_avro_pipeline::{consume, produce, shutdown, Cli, Mode};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.opts.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let Some(mode) = cli.mode else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let codec = Codec::from_file(&cli.opts.schema)
        .with_context(|| format!("Failed to load Avro schema from {:?}", cli.opts.schema))?;
    let shutdown = shutdown::shutdown_signal().context("Failed to install signal handlers")?;

    match mode {
        Mode::Produce => produce::run_produce(&cli.opts, codec, shutdown).await,
        Mode::Consume => consume::run_consume(&cli.opts, codec, shutdown).await,
    }
}
