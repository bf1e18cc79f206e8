use kafka_types::ConnectionConfig;
use rdkafka::config::ClientConfig;

use crate::error::Result;

/// Configuration for Kafka consumer group membership
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub connection: ConnectionConfig,
    /// Consumer group ID
    ///
    /// Every instance started with the same group ID shares the topics'
    /// partitions; each partition is owned by one member at a time.
    pub group_id: String,
    /// Topics to subscribe to
    pub topics: Vec<String>,
    /// Auto offset reset strategy ("earliest" or "latest")
    ///
    /// Applies only when the group has no committed offset for a partition.
    /// "earliest" replays the partition from the oldest retained message.
    pub auto_offset_reset: String,
    /// Session timeout in milliseconds
    pub session_timeout_ms: u64,
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval_ms: u64,
    /// Partition assignment strategy ("roundrobin", "range", "cooperative-sticky")
    pub assignment_strategy: String,
    /// How often stored offsets are committed, in milliseconds
    ///
    /// Offsets are stored only after the handler has processed a message, so a
    /// commit never covers unprocessed messages.
    pub auto_commit_interval_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            group_id: "uct".to_string(),
            topics: vec!["ucenter".to_string()],
            auto_offset_reset: "earliest".to_string(),
            session_timeout_ms: 10_000,
            heartbeat_interval_ms: 5_000,
            assignment_strategy: "roundrobin".to_string(),
            auto_commit_interval_ms: 5_000,
        }
    }
}

impl ConsumerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.group_id.is_empty() {
            return Err(kafka_types::Error::MissingSetting("group_id".to_string()).into());
        }
        if self.topics.is_empty() {
            return Err(kafka_types::Error::MissingSetting("topics".to_string()).into());
        }
        Ok(())
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        self.validate()?;

        let mut config = self.connection.client_config()?;
        config
            .set("group.id", &self.group_id)
            .set("auto.offset.reset", &self.auto_offset_reset)
            .set("session.timeout.ms", self.session_timeout_ms.to_string())
            .set("heartbeat.interval.ms", self.heartbeat_interval_ms.to_string())
            .set("partition.assignment.strategy", &self.assignment_strategy)
            .set("enable.auto.commit", "true")
            .set("enable.auto.offset.store", "false")
            .set(
                "auto.commit.interval.ms",
                self.auto_commit_interval_ms.to_string(),
            )
            .set("enable.partition.eof", "false");
        Ok(config)
    }
}
