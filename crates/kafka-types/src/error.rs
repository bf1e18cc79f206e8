//! Error types for kafka-types crate.

use thiserror::Error;

/// Errors raised while validating shared configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

/// Result type alias for kafka-types operations.
pub type Result<T> = std::result::Result<T, Error>;
