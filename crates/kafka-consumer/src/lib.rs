//! Kafka consumer-group coordinator for kafka-avro-pipeline.
//!
//! Features:
//!
//! - Group membership: partitions are shared among every member started with the same group ID
//! - Generation lifecycle: handlers are set up on each assignment and cleaned up on each revocation
//! - Readiness: callers can wait for the current generation's assignment
//! - At-least-once delivery: offsets are stored only after a message has been handled

/// Consumer group configuration mapped onto rdkafka settings
pub mod config;
pub mod error;

/// Running member: membership loop, readiness and shutdown
pub mod group;
pub mod handler;

/// Per-generation readiness gate
pub mod ready;
mod sequence;
pub mod session;
pub mod testing;

/// Broker boundary: rdkafka-backed group membership
pub mod transport;

pub use config::ConsumerConfig;
pub use error::{Error, Result};
pub use group::ConsumerGroup;
pub use handler::{ConsumerGroupHandler, GroupHandler, SyncGroupHandler};
pub use kafka_types::{ConsumerMessage, TopicPartition};
pub use ready::{GroupState, ReadyGate};
pub use session::ConsumerSession;
pub use transport::{GroupTransport, KafkaGroup};
