//! Kafka producer library for kafka-avro-pipeline
//!
//! Publishes application records as Avro-encoded Kafka messages.
//!
//! ## Features
//!
//! - **Schema-bound encoding**: records are encoded with the shared [`avro_codec::Codec`]
//! - **Asynchronous publishing**: `publish` returns once the message is queued
//! - **Delivery tracking**: every queued message yields exactly one [`DeliveryEvent`]
//! - **Pluggable transport**: rdkafka in production, in-memory in tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use avro_codec::Codec;
//! use kafka_producer::{Producer, ProducerConfig, TimestampKeys};
//!
//! #[derive(serde::Serialize)]
//! struct CardSpending {
//!     id: i32,
//!     message: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let codec = Codec::from_file("cardspending.avsc")?;
//!     let mut producer = Producer::open(&ProducerConfig::default(), codec).await?;
//!     let mut keys = TimestampKeys::new();
//!
//!     let record = CardSpending { id: 0, message: "MsgNo. 0".to_string() };
//!     producer.publish(&record, keys.next_key()).await?;
//!
//!     for event in producer.flush().await? {
//!         println!("{}: {:?}", event.key_str(), event.outcome);
//!     }
//!     producer.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod keys;
pub mod producer;
pub mod testing;
pub mod transport;

pub use config::{ProducerConfig, RequiredAcks};
pub use error::{Error, Result};
pub use keys::TimestampKeys;
pub use kafka_types::{DeliveryEvent, DeliveryOutcome, WireMessage};
pub use producer::{DeliveryStats, Producer, Submitted};
pub use transport::{DeliveryFuture, KafkaTransport, ProducerTransport};
