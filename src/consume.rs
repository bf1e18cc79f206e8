use anyhow::Context;
use avro_codec::Codec;
use kafka_consumer::{
    ConsumerGroup, ConsumerGroupHandler, ConsumerMessage, ConsumerSession, GroupTransport,
    SyncGroupHandler,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineOpts;
use crate::record::CardSpending;

/// Handler that decodes every payload into a [`CardSpending`] and logs it.
///
/// A payload that does not decode into that record fails the handler, which
/// stops the consumer.
pub fn decode_handler(
    codec: Codec,
) -> SyncGroupHandler<impl Fn(&ConsumerSession, &ConsumerMessage) -> anyhow::Result<()> + Send + Sync>
{
    SyncGroupHandler::new(
        move |_session: &ConsumerSession, message: &ConsumerMessage| {
            let record: CardSpending = codec
                .decode(&message.payload)
                .context("Failed to decode payload")?;

            tracing::info!(
                key = %message.key_str(),
                partition = message.partition,
                offset = message.offset,
                "{}",
                serde_json::to_string(&record)?
            );
            Ok(())
        },
    )
}

/// Run until shutdown or until the group stops on its own.
pub async fn serve<T, H>(
    group: &mut ConsumerGroup<T, H>,
    shutdown: &CancellationToken,
) -> anyhow::Result<()>
where
    T: GroupTransport + 'static,
    H: ConsumerGroupHandler + 'static,
{
    tracing::info!("consumer up and running");

    tokio::select! {
        _ = shutdown.cancelled() => Ok(()),
        result = group.wait() => {
            result.context("Consumer group stopped")?;
            tracing::info!("Consumer group closed");
            Ok(())
        }
    }
}

pub async fn run_consume(
    opts: &PipelineOpts,
    codec: Codec,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let config = opts.consumer_config()?;
    let handler = Arc::new(decode_handler(codec));

    let mut group = tokio::select! {
        group = ConsumerGroup::open(&config, handler) => {
            group.context("Failed to join consumer group")?
        }
        _ = shutdown.cancelled() => {
            tracing::info!("Shutdown requested before the consumer group was ready");
            return Ok(());
        }
    };

    let served = serve(&mut group, &shutdown).await;
    let closed = group.close().await.context("Failed to close consumer group");

    served?;
    closed
}
