use avro_codec::Codec;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use kafka_types::{DeliveryEvent, DeliveryOutcome, WireMessage};
use serde::Serialize;
use std::time::Duration;

use crate::config::ProducerConfig;
use crate::error::{Error, Result};
use crate::transport::{KafkaTransport, ProducerTransport};

/// Receipt for a message accepted into the outbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    /// Matches the `sequence` of the eventual [`DeliveryEvent`]
    pub sequence: u64,
    pub key: Vec<u8>,
}

/// Running totals of what the producer has submitted and observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub submitted: u64,
    pub acked: u64,
    pub failed: u64,
}

impl DeliveryStats {
    pub fn outstanding(&self) -> u64 {
        self.submitted - self.acked - self.failed
    }
}

/// Publishes records to one topic, encoding them with the shared codec.
///
/// `publish` returns as soon as the transport has queued the message. The
/// broker's verdict for every queued message is collected as a
/// [`DeliveryEvent`]: completed deliveries are drained on each `publish`
/// without blocking, and `flush`/`close` wait for the rest. Nothing runs in
/// the background, so no outcome is dropped unobserved.
pub struct Producer<T: ProducerTransport = KafkaTransport> {
    transport: Option<T>,
    codec: Codec,
    topic: String,
    flush_timeout: Duration,
    in_flight: FuturesUnordered<BoxFuture<'static, DeliveryEvent>>,
    events: Vec<DeliveryEvent>,
    stats: DeliveryStats,
}

impl Producer<KafkaTransport> {
    /// Connect to the brokers described by `config`.
    pub async fn open(config: &ProducerConfig, codec: Codec) -> Result<Self> {
        let transport = KafkaTransport::connect(config).await?;
        let mut producer = Self::with_transport(transport, config.topic.clone(), codec);
        producer.flush_timeout = Duration::from_millis(config.flush_timeout_ms);
        Ok(producer)
    }
}

impl<T: ProducerTransport> Producer<T> {
    pub fn with_transport(transport: T, topic: impl Into<String>, codec: Codec) -> Self {
        Self {
            transport: Some(transport),
            codec,
            topic: topic.into(),
            flush_timeout: Duration::from_secs(10),
            in_flight: FuturesUnordered::new(),
            events: Vec::new(),
            stats: DeliveryStats::default(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    pub fn stats(&self) -> DeliveryStats {
        self.stats
    }

    /// Encode `record` and queue it for sending under `key`.
    ///
    /// An encode failure aborts this record only and nothing is sent. A
    /// transport rejection is reported as [`Error::Publish`]; the producer
    /// remains usable in both cases.
    pub async fn publish<R: Serialize>(
        &mut self,
        record: &R,
        key: impl Into<Vec<u8>>,
    ) -> Result<Submitted> {
        let transport = self.transport.as_ref().ok_or(Error::Closed)?;
        let key = key.into();

        let value = self.codec.encode(record).map_err(|source| Error::Encode {
            key: String::from_utf8_lossy(&key).into_owned(),
            source,
        })?;
        let message = WireMessage::new(self.topic.clone(), key.clone(), value);

        let delivery = match transport.submit(message).await {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::warn!("Failed to send message to kafka: {e}");
                return Err(e);
            }
        };

        let sequence = self.stats.submitted;
        self.stats.submitted += 1;
        let event_key = key.clone();
        self.in_flight.push(Box::pin(async move {
            DeliveryEvent {
                sequence,
                key: event_key,
                outcome: delivery.await,
            }
        }));

        self.drain_ready();
        Ok(Submitted { sequence, key })
    }

    /// Take the delivery events observed so far.
    pub fn take_events(&mut self) -> Vec<DeliveryEvent> {
        std::mem::take(&mut self.events)
    }

    /// Flush the transport and wait for every outstanding delivery.
    ///
    /// Returns all events not yet taken, in the order they were observed.
    pub async fn flush(&mut self) -> Result<Vec<DeliveryEvent>> {
        let transport = self.transport.as_ref().ok_or(Error::Closed)?;
        transport.flush(self.flush_timeout).await?;
        self.drain_all().await;
        Ok(self.take_events())
    }

    /// Flush and release the transport. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        let Some(transport) = self.transport.as_ref() else {
            return Ok(());
        };

        let flushed = transport.flush(self.flush_timeout).await;
        self.drain_all().await;
        self.transport = None;

        tracing::info!(
            "Producer for topic {} closed: {} submitted, {} acked, {} failed",
            self.topic,
            self.stats.submitted,
            self.stats.acked,
            self.stats.failed
        );
        flushed
    }

    fn drain_ready(&mut self) {
        while let Some(Some(event)) = self.in_flight.next().now_or_never() {
            self.observe(event);
        }
    }

    async fn drain_all(&mut self) {
        while let Some(event) = self.in_flight.next().await {
            self.observe(event);
        }
    }

    fn observe(&mut self, event: DeliveryEvent) {
        match &event.outcome {
            DeliveryOutcome::Acked { partition, offset } => {
                self.stats.acked += 1;
                tracing::debug!(
                    "Delivered message {} (key {}) to {}/{partition} at offset {offset}",
                    event.sequence,
                    event.key_str(),
                    self.topic
                );
            }
            DeliveryOutcome::Failed(reason) => {
                self.stats.failed += 1;
                tracing::warn!(
                    "Delivery of message {} (key {}) failed: {reason}",
                    event.sequence,
                    event.key_str()
                );
            }
        }
        self.events.push(event);
    }
}

impl<T: ProducerTransport> Drop for Producer<T> {
    fn drop(&mut self) {
        if self.transport.is_some() && !self.in_flight.is_empty() {
            tracing::warn!(
                "Producer for topic {} dropped with {} deliveries outstanding; call close() to flush",
                self.topic,
                self.in_flight.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::TimestampKeys;
    use crate::testing::MemoryTransport;
    use serde::Serialize;
    use std::collections::HashSet;

    const CARD_SPENDING: &str = r#"{
        "type": "record",
        "name": "CardSpending",
        "fields": [
            {"name": "id", "type": "int"},
            {"name": "message", "type": "string"}
        ]
    }"#;

    #[derive(Serialize)]
    struct CardSpending {
        id: i32,
        message: String,
    }

    #[derive(Serialize)]
    struct NotACardSpending {
        amount: f64,
    }

    fn producer(transport: MemoryTransport) -> Producer<MemoryTransport> {
        let codec = Codec::from_schema_str(CARD_SPENDING).unwrap();
        Producer::with_transport(transport, "ucenter", codec)
    }

    fn record(id: i32) -> CardSpending {
        CardSpending {
            id,
            message: format!("MsgNo. {id}"),
        }
    }

    #[tokio::test]
    async fn test_ten_records_ten_events() {
        let transport = MemoryTransport::new(3);
        let mut keys = TimestampKeys::new();
        let key_list: Vec<String> = (&mut keys).take(10).collect();
        transport.fail_delivery(key_list[4].as_bytes());

        let mut producer = producer(transport.clone());
        for (i, key) in key_list.iter().enumerate() {
            let submitted = producer.publish(&record(i as i32), key.as_str()).await.unwrap();
            assert_eq!(submitted.sequence, i as u64);
        }

        let events = producer.flush().await.unwrap();
        assert_eq!(events.len(), 10);

        let sequences: HashSet<u64> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences.len(), 10);
        let event_keys: HashSet<Vec<u8>> = events.iter().map(|e| e.key.clone()).collect();
        assert_eq!(event_keys.len(), 10);

        assert_eq!(events.iter().filter(|e| e.is_acked()).count(), 9);
        let failed = events.iter().find(|e| !e.is_acked()).unwrap();
        assert_eq!(failed.key, key_list[4].as_bytes());

        assert_eq!(
            producer.stats(),
            DeliveryStats {
                submitted: 10,
                acked: 9,
                failed: 1
            }
        );
        assert_eq!(transport.messages().len(), 10);
    }

    #[tokio::test]
    async fn test_encode_failure_publishes_nothing() {
        let transport = MemoryTransport::new(1);
        let mut producer = producer(transport.clone());

        let err = producer
            .publish(&NotACardSpending { amount: 1.5 }, "k1")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Encode { ref key, .. } if key == "k1"));
        assert!(err.is_per_message());
        assert!(transport.messages().is_empty());
        assert_eq!(producer.stats().submitted, 0);

        // The producer keeps working after a bad record
        producer.publish(&record(1), "k2").await.unwrap();
        assert_eq!(transport.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_submission_reported_per_message() {
        let transport = MemoryTransport::new(1);
        transport.reject_key(b"busy");
        let mut producer = producer(transport.clone());

        let err = producer.publish(&record(1), "busy").await.unwrap_err();
        assert!(matches!(err, Error::Publish { ref key, .. } if key == "busy"));

        producer.publish(&record(2), "ok").await.unwrap();
        let events = producer.flush().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key, b"ok");
    }

    #[tokio::test]
    async fn test_publish_drains_completed_deliveries() {
        let transport = MemoryTransport::new(1);
        let mut producer = producer(transport);

        producer.publish(&record(1), "a").await.unwrap();
        producer.publish(&record(2), "b").await.unwrap();

        // Memory deliveries complete immediately, so they are already drained
        let events = producer.take_events();
        assert_eq!(events.len(), 2);
        assert_eq!(producer.stats().outstanding(), 0);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let transport = MemoryTransport::new(1);
        let mut producer = producer(transport.clone());
        producer.publish(&record(1), "a").await.unwrap();

        producer.close().await.unwrap();
        assert!(producer.is_closed());
        producer.close().await.unwrap();

        assert_eq!(transport.flushes(), 1);
        assert!(matches!(
            producer.publish(&record(2), "b").await,
            Err(Error::Closed)
        ));
    }

    #[tokio::test]
    async fn test_close_unopened_producer() {
        let mut producer: Option<Producer<MemoryTransport>> = None;
        if let Some(producer) = producer.as_mut() {
            producer.close().await.unwrap();
        }
        assert!(producer.is_none());
    }
}
