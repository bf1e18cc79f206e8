//! Command-line configuration.
//!
//! Flags map onto the library configs of the producer and consumer crates;
//! SASL credentials may also come from the environment.

use anyhow::bail;
use clap::{ArgAction, Parser, ValueEnum};
use kafka_consumer::ConsumerConfig;
use kafka_producer::ProducerConfig;
use kafka_types::{ConnectionConfig, SaslCredentials, SecurityConfig};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Publish CardSpending records
    Produce,
    /// Join the consumer group and log every record
    Consume,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "kafka-avro-pipeline")]
#[command(about = "Produce and consume Avro-encoded records on Kafka")]
#[command(long_about = None)]
pub struct Cli {
    /// Run mode; prints this help when omitted
    #[arg(short, long, value_enum)]
    pub mode: Option<Mode>,

    #[command(flatten)]
    pub opts: PipelineOpts,
}

#[derive(Debug, Clone, Parser)]
pub struct PipelineOpts {
    /// Kafka brokers (comma-separated or multiple --brokers)
    #[arg(short, long, value_delimiter = ',', default_value = "localhost:9092")]
    pub brokers: Vec<String>,

    /// Enable debug logging, including the Kafka client's own
    #[arg(long)]
    pub verbose: bool,

    /// Topic to produce to and consume from
    #[arg(long, default_value = "ucenter")]
    pub topic: String,

    /// Consumer group ID
    #[arg(long, default_value = "uct")]
    pub group_id: String,

    /// Avro schema file for record values
    #[arg(long, default_value = "cardspending.avsc")]
    pub schema: PathBuf,

    /// Number of records to produce
    #[arg(long, default_value_t = 10)]
    pub count: usize,

    /// Client identifier reported to the brokers
    #[arg(long, default_value = "kafka-avro-pipeline")]
    pub client_id: String,

    /// Encrypt broker connections with TLS
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub tls: bool,

    /// Accept any broker certificate
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub skip_tls_verify: bool,

    /// SASL/PLAIN username
    #[arg(long, env = "SASL_USER")]
    pub sasl_user: Option<String>,

    /// SASL/PLAIN password
    #[arg(long, env = "SASL_PASSWORD", hide_env_values = true)]
    pub sasl_password: Option<String>,
}

impl PipelineOpts {
    pub fn connection(&self) -> anyhow::Result<ConnectionConfig> {
        let sasl = match (&self.sasl_user, &self.sasl_password) {
            (Some(user), Some(password)) => Some(SaslCredentials::plain(user, password)),
            (None, None) => None,
            _ => bail!("SASL_USER and SASL_PASSWORD must be set together"),
        };

        let connection = ConnectionConfig {
            brokers: self.brokers.clone(),
            client_id: self.client_id.clone(),
            security: SecurityConfig {
                tls: self.tls,
                verify_certificates: !self.skip_tls_verify,
                sasl,
            },
            verbose: self.verbose,
        };
        connection.validate()?;
        Ok(connection)
    }

    pub fn producer_config(&self) -> anyhow::Result<ProducerConfig> {
        Ok(ProducerConfig {
            connection: self.connection()?,
            topic: self.topic.clone(),
            ..Default::default()
        })
    }

    pub fn consumer_config(&self) -> anyhow::Result<ConsumerConfig> {
        Ok(ConsumerConfig {
            connection: self.connection()?,
            group_id: self.group_id.clone(),
            topics: vec![self.topic.clone()],
            ..Default::default()
        })
    }
}
