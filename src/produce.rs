use anyhow::Context;
use avro_codec::Codec;
use kafka_producer::{Producer, ProducerTransport, TimestampKeys};
use tokio_util::sync::CancellationToken;

use crate::config::PipelineOpts;
use crate::record::CardSpending;

/// Publish `count` numbered records, stopping early on shutdown.
///
/// Per-message failures are logged with their key and skipped; any other
/// failure stops publishing. Returns the number of records queued.
pub async fn produce_records<T: ProducerTransport>(
    producer: &mut Producer<T>,
    count: usize,
    keys: &mut TimestampKeys,
    shutdown: &CancellationToken,
) -> anyhow::Result<usize> {
    let mut produced = 0;

    for id in 0..count {
        if shutdown.is_cancelled() {
            tracing::info!("Shutdown requested after {produced} of {count} messages");
            break;
        }

        let key = keys.next_key();
        let record = CardSpending::numbered(i32::try_from(id)?);
        match producer.publish(&record, key.as_str()).await {
            Ok(_) => {
                produced += 1;
                tracing::info!("produced {produced} messages");
            }
            Err(e) if e.is_per_message() => {
                tracing::warn!(key = %key, "Failed to produce message {id}: {e}");
            }
            Err(e) => return Err(e).context("Producer stopped"),
        }
    }

    Ok(produced)
}

/// Publish, wait for every delivery to settle, then hold the producer open
/// until shutdown.
pub async fn serve<T: ProducerTransport>(
    producer: &mut Producer<T>,
    count: usize,
    shutdown: &CancellationToken,
) -> anyhow::Result<usize> {
    let mut keys = TimestampKeys::new();
    let produced = produce_records(producer, count, &mut keys, shutdown).await?;

    tokio::select! {
        flushed = producer.flush() => match flushed {
            Ok(_) => {
                let stats = producer.stats();
                tracing::info!(
                    "All deliveries settled: {} acked, {} failed",
                    stats.acked,
                    stats.failed
                );
            }
            Err(e) => tracing::warn!("Failed to flush producer: {e}"),
        },
        _ = shutdown.cancelled() => {}
    }

    shutdown.cancelled().await;
    Ok(produced)
}

pub async fn run_produce(
    opts: &PipelineOpts,
    codec: Codec,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let config = opts.producer_config()?;
    let mut producer = Producer::open(&config, codec)
        .await
        .context("Failed to open producer")?;
    tracing::info!("Producing {} messages to topic {}", opts.count, producer.topic());

    let served = serve(&mut producer, opts.count, &shutdown).await;
    let closed = producer.close().await.context("Failed to close producer");

    served?;
    closed
}
