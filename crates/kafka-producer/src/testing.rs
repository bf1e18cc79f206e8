//! In-memory transport for exercising the producer without a broker.

use async_trait::async_trait;
use kafka_types::{DeliveryOutcome, TopicPartition, WireMessage};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::{DeliveryFuture, ProducerTransport};

#[derive(Default)]
struct MemoryLog {
    /// Every accepted message, in submission order
    accepted: Vec<WireMessage>,
    /// Next offset per partition
    offsets: HashMap<TopicPartition, i64>,
    rejected_keys: HashSet<Vec<u8>>,
    failing_keys: HashSet<Vec<u8>>,
    fail_all: bool,
    delivery_delay: Option<Duration>,
    flushes: usize,
}

/// Partitioned append-only log standing in for the broker.
///
/// Clones share the same log, so a test can keep a handle for inspection
/// after moving the transport into a producer.
#[derive(Clone)]
pub struct MemoryTransport {
    partitions: i32,
    log: Arc<Mutex<MemoryLog>>,
}

impl MemoryTransport {
    pub fn new(partitions: i32) -> Self {
        Self {
            partitions: partitions.max(1),
            log: Arc::new(Mutex::new(MemoryLog::default())),
        }
    }

    /// Refuse to queue messages with this key.
    pub fn reject_key(&self, key: &[u8]) {
        self.lock().rejected_keys.insert(key.to_vec());
    }

    /// Queue messages with this key but report their delivery as failed.
    pub fn fail_delivery(&self, key: &[u8]) {
        self.lock().failing_keys.insert(key.to_vec());
    }

    /// Report every delivery as failed.
    pub fn fail_every_delivery(&self) {
        self.lock().fail_all = true;
    }

    /// Settle each delivery only after `delay`.
    pub fn delay_deliveries(&self, delay: Duration) {
        self.lock().delivery_delay = Some(delay);
    }

    /// Messages accepted so far, in submission order.
    pub fn messages(&self) -> Vec<WireMessage> {
        self.lock().accepted.clone()
    }

    pub fn flushes(&self) -> usize {
        self.lock().flushes
    }

    pub fn partition_for(&self, key: &[u8]) -> i32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.partitions as u64) as i32
    }

    fn lock(&self) -> MutexGuard<'_, MemoryLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ProducerTransport for MemoryTransport {
    async fn submit(&self, message: WireMessage) -> Result<DeliveryFuture> {
        let partition = self.partition_for(&message.key);
        let mut log = self.lock();

        if log.rejected_keys.contains(&message.key) {
            return Err(Error::Publish {
                key: message.key_str().into_owned(),
                reason: "Local: Queue full".to_string(),
            });
        }

        let outcome = if log.fail_all || log.failing_keys.contains(&message.key) {
            DeliveryOutcome::Failed("Broker: Not enough in-sync replicas".to_string())
        } else {
            let next = log
                .offsets
                .entry(TopicPartition::new(message.topic.clone(), partition))
                .or_insert(0);
            let offset = *next;
            *next += 1;
            DeliveryOutcome::Acked { partition, offset }
        };

        let delay = log.delivery_delay;
        log.accepted.push(message);
        Ok(Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            outcome
        }))
    }

    async fn flush(&self, _timeout: Duration) -> Result<()> {
        self.lock().flushes += 1;
        Ok(())
    }
}
