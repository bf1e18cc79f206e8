//! Broker boundary for publishing.
//!
//! A transport accepts messages into an outbound queue and reports each
//! message's broker-side outcome separately, through the future returned at
//! submission time. [`KafkaTransport`] is backed by rdkafka's
//! `FutureProducer`; [`crate::testing::MemoryTransport`] keeps everything in
//! memory.

use async_trait::async_trait;
use futures::future::BoxFuture;
use kafka_types::{DeliveryOutcome, WireMessage};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer as _};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::ProducerConfig;
use crate::error::{Error, Result};

/// Resolves once the broker has acknowledged or rejected a submitted message.
pub type DeliveryFuture = BoxFuture<'static, DeliveryOutcome>;

#[async_trait]
pub trait ProducerTransport: Send + Sync {
    /// Queue `message` for sending without waiting for the broker.
    ///
    /// An error means the message never entered the queue.
    async fn submit(&self, message: WireMessage) -> Result<DeliveryFuture>;

    /// Wait until every queued message has been handed to the broker.
    async fn flush(&self, timeout: Duration) -> Result<()>;
}

/// Transport over an authenticated rdkafka `FutureProducer`.
#[derive(Clone)]
pub struct KafkaTransport {
    producer: FutureProducer,
    queue_timeout: Duration,
}

impl KafkaTransport {
    /// Create the producer and make one metadata round trip, so that bad
    /// endpoints or credentials fail here rather than on the first send.
    pub async fn connect(config: &ProducerConfig) -> Result<Self> {
        let producer: FutureProducer = config
            .client_config()?
            .create()
            .map_err(|e| Error::Connection(format!("Failed to create producer: {e}")))?;

        let topic = (!config.full_metadata).then(|| config.topic.clone());
        let timeout = Duration::from_millis(config.connect_timeout_ms);
        let client = producer.clone();
        let metadata = tokio::task::spawn_blocking(move || {
            client.client().fetch_metadata(topic.as_deref(), timeout)
        })
        .await
        .map_err(|e| Error::Connection(format!("Metadata task failed: {e}")))?
        .map_err(|e| Error::Connection(format!("Failed to fetch cluster metadata: {e}")))?;

        tracing::info!(
            "Connected to Kafka: {} brokers, {} topics visible",
            metadata.brokers().len(),
            metadata.topics().len()
        );

        Ok(Self {
            producer,
            queue_timeout: Duration::from_millis(config.queue_timeout_ms),
        })
    }
}

#[async_trait]
impl ProducerTransport for KafkaTransport {
    async fn submit(&self, message: WireMessage) -> Result<DeliveryFuture> {
        let deadline = Instant::now() + self.queue_timeout;

        loop {
            let record = FutureRecord::to(&message.topic)
                .key(message.key.as_slice())
                .payload(message.value.as_slice());

            let reason = match self.producer.send_result(record) {
                Ok(delivery) => {
                    return Ok(Box::pin(async move {
                        match delivery.await {
                            Ok(Ok((partition, offset))) => {
                                DeliveryOutcome::Acked { partition, offset }
                            }
                            Ok(Err((err, _))) => DeliveryOutcome::Failed(err.to_string()),
                            Err(_) => DeliveryOutcome::Failed(
                                "producer dropped before delivery was reported".to_string(),
                            ),
                        }
                    }));
                }
                Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _))
                    if Instant::now() < deadline =>
                {
                    None
                }
                Err((err, _)) => Some(err.to_string()),
            };

            match reason {
                // Outbound queue full: wait for room, like FutureProducer::send
                None => tokio::time::sleep(Duration::from_millis(100)).await,
                Some(reason) => {
                    return Err(Error::Publish {
                        key: message.key_str().into_owned(),
                        reason,
                    })
                }
            }
        }
    }

    async fn flush(&self, timeout: Duration) -> Result<()> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| Error::Connection(format!("Flush task failed: {e}")))??;
        Ok(())
    }
}
