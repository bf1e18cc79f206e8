//! Produce and consume Avro-encoded records on Kafka.
//!
//! The binary runs in one of two modes:
//!
//! ```bash
//! # Publish 10 CardSpending records to the ucenter topic
//! kafka-avro-pipeline -m produce -b broker-1:9092 --count 10
//!
//! # Join the uct consumer group and log every record
//! SASL_USER=svc SASL_PASSWORD=... kafka-avro-pipeline -m consume -b broker-1:9092
//! ```
//!
//! Both modes share one [`avro_codec::Codec`] loaded from the `--schema`
//! file and run until SIGINT, SIGTERM or SIGQUIT.

pub mod config;
pub mod consume;
pub mod produce;
pub mod record;
pub mod shutdown;

pub use config::{Cli, Mode, PipelineOpts};
pub use record::CardSpending;
