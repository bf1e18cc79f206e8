//! Kafka message types.
//!
//! Envelopes exchanged with the broker. The payload bytes are always the
//! schema-bound binary encoding produced by the codec; these types never
//! interpret them.

use std::borrow::Cow;
use std::fmt;

/// The binary envelope handed to the broker for publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    /// Destination topic
    pub topic: String,
    /// Partitioning/ordering key
    pub key: Vec<u8>,
    /// Schema-bound binary encoding of a record
    pub value: Vec<u8>,
}

impl WireMessage {
    pub fn new(topic: impl Into<String>, key: impl Into<Vec<u8>>, value: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            key: key.into(),
            value,
        }
    }

    /// Key rendered for log lines.
    pub fn key_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }
}

/// A message received from the broker, with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerMessage {
    /// Kafka topic name
    pub topic: String,
    /// Kafka partition number
    pub partition: i32,
    /// Kafka offset within the partition
    pub offset: i64,
    /// Message key (if any)
    pub key: Option<Vec<u8>>,
    /// Raw payload; empty when the broker delivered a null value
    pub payload: Vec<u8>,
    /// Message timestamp in milliseconds since epoch (if available)
    pub timestamp: Option<i64>,
}

impl ConsumerMessage {
    pub fn topic_partition(&self) -> TopicPartition {
        TopicPartition::new(self.topic.clone(), self.partition)
    }

    /// Key rendered for log lines; `-` when the message has no key.
    pub fn key_str(&self) -> Cow<'_, str> {
        match &self.key {
            Some(key) => String::from_utf8_lossy(key),
            None => Cow::Borrowed("-"),
        }
    }
}

/// A single partition of a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.topic, self.partition)
    }
}

/// Broker-side outcome of one publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Stored by the broker at the given position
    Acked { partition: i32, offset: i64 },
    /// Rejected or timed out after the client's retries were exhausted
    Failed(String),
}

/// Delivery outcome correlated to the message that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryEvent {
    /// Per-producer submission counter, starting at 0
    pub sequence: u64,
    /// Key of the originating message
    pub key: Vec<u8>,
    pub outcome: DeliveryOutcome,
}

impl DeliveryEvent {
    pub fn is_acked(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Acked { .. })
    }

    pub fn key_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consumer_message_without_key() {
        let message = ConsumerMessage {
            topic: "ucenter".to_string(),
            partition: 2,
            offset: 41,
            key: None,
            payload: vec![0x06],
            timestamp: None,
        };

        assert_eq!(message.key_str(), "-");
        assert_eq!(message.topic_partition(), TopicPartition::new("ucenter", 2));
        assert_eq!(message.topic_partition().to_string(), "ucenter/2");
    }

    #[test]
    fn test_delivery_event_outcome() {
        let acked = DeliveryEvent {
            sequence: 0,
            key: b"1700000000000".to_vec(),
            outcome: DeliveryOutcome::Acked {
                partition: 0,
                offset: 7,
            },
        };
        let failed = DeliveryEvent {
            sequence: 1,
            key: b"1700000000001".to_vec(),
            outcome: DeliveryOutcome::Failed("Broker: Message size too large".to_string()),
        };

        assert!(acked.is_acked());
        assert!(!failed.is_acked());
        assert_eq!(failed.key_str(), "1700000000001");
    }
}
