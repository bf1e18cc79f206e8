//! Schema-bound codec.
//!
//! Records travel through two transcoding steps in each direction:
//!
//! ```text
//! encode:  record ──serde_json──▶ textual (JSON) ──schema──▶ binary (Avro datum)
//! decode:  binary (Avro datum) ──schema──▶ textual (JSON) ──serde_json──▶ record
//! ```
//!
//! The textual step keeps application types independent of Avro: any
//! `Serialize`/`Deserialize` type whose JSON shape matches the schema works.

use apache_avro::Schema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::convert::{avro_to_json, json_to_avro};
use crate::error::{Error, Result};

/// Encoder/decoder bound to one parsed schema.
///
/// Cloning is cheap and every clone shares the same parsed schema, so a
/// single codec loaded at startup can be handed to the producer and the
/// consumer alike.
#[derive(Debug, Clone)]
pub struct Codec {
    schema: Arc<Schema>,
}

impl Codec {
    /// Load the schema document from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::SchemaFile {
            path: path.display().to_string(),
            source,
        })?;
        let codec = Self::from_schema_str(&text)?;
        tracing::info!("Loaded schema from {}", path.display());
        Ok(codec)
    }

    /// Parse the schema document from a string.
    pub fn from_schema_str(text: &str) -> Result<Self> {
        let schema = Schema::parse_str(text).map_err(|e| Error::Schema(e.to_string()))?;
        Ok(Self {
            schema: Arc::new(schema),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Encode a structured record into its binary wire form.
    pub fn encode<T: Serialize>(&self, record: &T) -> Result<Vec<u8>> {
        let textual = serde_json::to_vec(record)
            .map_err(|e| Error::Encode(format!("record has no textual form: {e}")))?;
        self.binary_from_textual(&textual)
    }

    /// Decode binary wire bytes back into a structured record.
    pub fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        let textual = self.textual_from_binary(data)?;
        serde_json::from_slice(&textual)
            .map_err(|e| Error::Decode(format!("textual form does not match record type: {e}")))
    }

    /// Textual (JSON) → binary step.
    pub fn binary_from_textual(&self, textual: &[u8]) -> Result<Vec<u8>> {
        let json: serde_json::Value = serde_json::from_slice(textual)
            .map_err(|e| Error::Encode(format!("invalid textual form: {e}")))?;
        let value = json_to_avro(&json, &self.schema, "$")?;
        apache_avro::to_avro_datum(&self.schema, value).map_err(|e| Error::Encode(e.to_string()))
    }

    /// Binary → textual (JSON) step.
    ///
    /// The whole input must be consumed by exactly one datum; leftover bytes
    /// mean the payload was not written with this schema.
    pub fn textual_from_binary(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut reader = data;
        let value = apache_avro::from_avro_datum(&self.schema, &mut reader, None)
            .map_err(|e| Error::Decode(e.to_string()))?;
        if !reader.is_empty() {
            return Err(Error::Decode(format!(
                "{} trailing bytes after datum",
                reader.len()
            )));
        }
        let json = avro_to_json(value)?;
        serde_json::to_vec(&json).map_err(|e| Error::Decode(e.to_string()))
    }
}
