use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read schema file {path}: {source}")]
    SchemaFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema parse error: {0}")]
    Schema(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl Error {
    /// Startup errors: the schema could not be loaded at all.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::SchemaFile { .. } | Error::Schema(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
