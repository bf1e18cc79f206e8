use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    InvalidConfig(#[from] kafka_types::Error),

    #[error("Failed to encode record with key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: avro_codec::Error,
    },

    #[error("Failed to publish message with key {key}: {reason}")]
    Publish { key: String, reason: String },

    #[error("Producer is closed")]
    Closed,
}

impl Error {
    /// Errors scoped to a single record; the producer stays usable.
    pub fn is_per_message(&self) -> bool {
        matches!(self, Error::Encode { .. } | Error::Publish { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
