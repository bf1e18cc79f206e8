//! Avro codec for kafka-avro-pipeline.
//!
//! Converts between application records and the schema-bound binary form
//! carried in Kafka message values. The schema is parsed once and shared by
//! every clone of the [`Codec`].
//!
//! # Example
//!
//! ```
//! use avro_codec::Codec;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct CardSpending {
//!     id: i32,
//!     message: String,
//! }
//!
//! let codec = Codec::from_schema_str(
//!     r#"{"type": "record", "name": "CardSpending", "fields": [
//!         {"name": "id", "type": "int"},
//!         {"name": "message", "type": "string"}
//!     ]}"#,
//! )?;
//!
//! let record = CardSpending { id: 3, message: "MsgNo. 3".to_string() };
//! let bytes = codec.encode(&record)?;
//! assert_eq!(codec.decode::<CardSpending>(&bytes)?, record);
//! # Ok::<(), avro_codec::Error>(())
//! ```

pub mod codec;
mod convert;
pub mod error;

pub use codec::Codec;
pub use error::{Error, Result};
