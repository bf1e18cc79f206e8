//! Shared types for the kafka-avro-pipeline crates.
//!
//! This crate provides the types that cross the broker boundary in both
//! directions, so that the producer and consumer crates agree on them:
//!
//! ```text
//! Producer:  record → Codec → WireMessage → broker → DeliveryEvent
//! Consumer:  broker → ConsumerMessage → Codec → record
//! ```
//!
//! # Modules
//!
//! - [`message`] - Wire envelopes and delivery outcomes
//! - [`connection`] - Broker endpoints and TLS/SASL settings for rdkafka
//! - [`error`] - Error types for configuration validation

pub mod connection;
pub mod error;
pub mod message;

// Re-export main types for convenient access
pub use connection::{ConnectionConfig, SaslCredentials, SecurityConfig};
pub use error::{Error, Result};
pub use message::{ConsumerMessage, DeliveryEvent, DeliveryOutcome, TopicPartition, WireMessage};
