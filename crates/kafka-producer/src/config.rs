use kafka_types::ConnectionConfig;
use rdkafka::config::ClientConfig;

use crate::error::Result;

/// Broker acknowledgment required before a send counts as delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredAcks {
    /// Fire and forget
    None,
    /// Partition leader only
    Leader,
    /// Full in-sync replica set
    All,
}

impl RequiredAcks {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredAcks::None => "0",
            RequiredAcks::Leader => "1",
            RequiredAcks::All => "all",
        }
    }
}

/// Configuration for the Kafka producer
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub connection: ConnectionConfig,
    /// Topic every record is published to
    pub topic: String,
    /// How many times the client retries a transient send failure before
    /// reporting it
    pub max_retries: u32,
    pub required_acks: RequiredAcks,
    /// Fetch metadata for the whole cluster rather than only the topics in use
    pub full_metadata: bool,
    /// Upper bound on the time a message may wait for delivery, retries included
    pub message_timeout_ms: u64,
    /// How long `publish` waits for room in a full outbound queue
    pub queue_timeout_ms: u64,
    /// How long `open` waits for the initial metadata round trip
    pub connect_timeout_ms: u64,
    /// How long `flush`/`close` wait for outstanding messages
    pub flush_timeout_ms: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            topic: "ucenter".to_string(),
            max_retries: 5,
            required_acks: RequiredAcks::All,
            full_metadata: true,
            message_timeout_ms: 30_000,
            queue_timeout_ms: 5_000,
            connect_timeout_ms: 10_000,
            flush_timeout_ms: 10_000,
        }
    }
}

impl ProducerConfig {
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut config = self.connection.client_config()?;
        config
            .set("acks", self.required_acks.as_str())
            .set("message.send.max.retries", self.max_retries.to_string())
            .set("message.timeout.ms", self.message_timeout_ms.to_string())
            .set(
                "topic.metadata.refresh.sparse",
                (!self.full_metadata).to_string(),
            );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_producer_settings() {
        let config = ProducerConfig::default()
            .client_config()
            .expect("valid config");

        assert_eq!(config.get("acks"), Some("all"));
        assert_eq!(config.get("message.send.max.retries"), Some("5"));
        assert_eq!(config.get("topic.metadata.refresh.sparse"), Some("false"));
        assert_eq!(config.get("bootstrap.servers"), Some("localhost:9092"));
    }

    #[test]
    fn test_leader_acks() {
        let config = ProducerConfig {
            required_acks: RequiredAcks::Leader,
            full_metadata: false,
            ..Default::default()
        }
        .client_config()
        .expect("valid config");

        assert_eq!(config.get("acks"), Some("1"));
        assert_eq!(config.get("topic.metadata.refresh.sparse"), Some("true"));
    }
}
