use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error(transparent)]
    InvalidConfig(#[from] kafka_types::Error),

    #[error("Consumer group membership failed: {0}")]
    Membership(String),

    #[error("Message handler failed at {topic}/{partition} offset {offset}: {reason}")]
    Handler {
        topic: String,
        partition: i32,
        offset: i64,
        reason: String,
    },

    #[error("Consumer group is closed")]
    Closed,
}

impl Error {
    /// Explicit closure is the only way the membership loop may stop without
    /// a failure.
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
