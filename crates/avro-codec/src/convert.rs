//! Conversion between the textual (JSON) form and Avro values.
//!
//! The JSON → Avro direction walks the schema and is strict: every value must
//! match its schema type exactly, records may not carry fields the schema
//! does not declare, and integers must fit their declared width. The
//! Avro → JSON direction is total for everything the decoder can produce,
//! except non-finite floats, which JSON cannot represent.

use apache_avro::types::Value;
use apache_avro::Schema;
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Convert a JSON value into an Avro value conforming to `schema`.
///
/// `path` locates the value inside the record and is only used for error
/// messages (`$` is the root).
pub(crate) fn json_to_avro(value: &JsonValue, schema: &Schema, path: &str) -> Result<Value> {
    match schema {
        Schema::Null => match value {
            JsonValue::Null => Ok(Value::Null),
            other => Err(mismatch(path, "null", other)),
        },
        Schema::Boolean => match value {
            JsonValue::Bool(b) => Ok(Value::Boolean(*b)),
            other => Err(mismatch(path, "boolean", other)),
        },
        Schema::Int => Ok(Value::Int(json_to_i32(value, path)?)),
        Schema::Date => Ok(Value::Date(json_to_i32(value, path)?)),
        Schema::TimeMillis => Ok(Value::TimeMillis(json_to_i32(value, path)?)),
        Schema::Long => Ok(Value::Long(json_to_i64(value, path)?)),
        Schema::TimeMicros => Ok(Value::TimeMicros(json_to_i64(value, path)?)),
        Schema::TimestampMillis => Ok(Value::TimestampMillis(json_to_i64(value, path)?)),
        Schema::TimestampMicros => Ok(Value::TimestampMicros(json_to_i64(value, path)?)),
        Schema::LocalTimestampMillis => Ok(Value::LocalTimestampMillis(json_to_i64(value, path)?)),
        Schema::LocalTimestampMicros => Ok(Value::LocalTimestampMicros(json_to_i64(value, path)?)),
        Schema::Float => Ok(Value::Float(json_to_f64(value, path)? as f32)),
        Schema::Double => Ok(Value::Double(json_to_f64(value, path)?)),
        Schema::String => match value {
            JsonValue::String(s) => Ok(Value::String(s.clone())),
            other => Err(mismatch(path, "string", other)),
        },
        Schema::Bytes => Ok(Value::Bytes(json_to_octets(value, path)?)),
        Schema::Fixed(fixed) => {
            let bytes = json_to_octets(value, path)?;
            if bytes.len() != fixed.size {
                return Err(Error::Encode(format!(
                    "{path}: expected {} bytes for fixed `{}`, got {}",
                    fixed.size,
                    fixed.name.name,
                    bytes.len()
                )));
            }
            Ok(Value::Fixed(fixed.size, bytes))
        }
        Schema::Enum(enum_schema) => match value {
            JsonValue::String(symbol) => {
                let index = enum_schema
                    .symbols
                    .iter()
                    .position(|s| s == symbol)
                    .ok_or_else(|| {
                        Error::Encode(format!(
                            "{path}: `{symbol}` is not a symbol of enum `{}`",
                            enum_schema.name.name
                        ))
                    })?;
                Ok(Value::Enum(index as u32, symbol.clone()))
            }
            other => Err(mismatch(path, "enum symbol", other)),
        },
        Schema::Array(array) => match value {
            JsonValue::Array(items) => {
                let values = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| json_to_avro(item, &array.items, &format!("{path}[{i}]")))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Array(values))
            }
            other => Err(mismatch(path, "array", other)),
        },
        Schema::Map(map) => match value {
            JsonValue::Object(entries) => {
                let mut values = HashMap::with_capacity(entries.len());
                for (key, entry) in entries {
                    let entry = json_to_avro(entry, &map.types, &format!("{path}.{key}"))?;
                    values.insert(key.clone(), entry);
                }
                Ok(Value::Map(values))
            }
            other => Err(mismatch(path, "map", other)),
        },
        Schema::Union(union) => {
            for (index, variant) in union.variants().iter().enumerate() {
                if let Ok(v) = json_to_avro(value, variant, path) {
                    return Ok(Value::Union(index as u32, Box::new(v)));
                }
            }
            Err(Error::Encode(format!(
                "{path}: {} value matches no branch of the union",
                json_kind(value)
            )))
        }
        Schema::Record(record) => match value {
            JsonValue::Object(entries) => {
                if let Some(unknown) = entries.keys().find(|k| !record.lookup.contains_key(*k)) {
                    return Err(Error::Encode(format!(
                        "{path}: field `{unknown}` is not declared by record `{}`",
                        record.name.name
                    )));
                }

                let mut fields = Vec::with_capacity(record.fields.len());
                for field in &record.fields {
                    let field_path = format!("{path}.{}", field.name);
                    let field_value = match (entries.get(&field.name), &field.default) {
                        (Some(v), _) => json_to_avro(v, &field.schema, &field_path)?,
                        (None, Some(default)) => {
                            json_to_avro(default, &field.schema, &field_path)?
                        }
                        (None, None) => {
                            return Err(Error::Encode(format!(
                                "{field_path}: missing required field"
                            )))
                        }
                    };
                    fields.push((field.name.clone(), field_value));
                }
                Ok(Value::Record(fields))
            }
            other => Err(mismatch(path, "record", other)),
        },
        other => Err(Error::Encode(format!(
            "{path}: unsupported schema type {other:?}"
        ))),
    }
}

/// Convert a decoded Avro value into its textual JSON form.
pub(crate) fn avro_to_json(value: Value) -> Result<JsonValue> {
    match value {
        Value::Null => Ok(JsonValue::Null),
        Value::Boolean(b) => Ok(JsonValue::Bool(b)),
        Value::Int(i) | Value::Date(i) | Value::TimeMillis(i) => Ok(JsonValue::from(i)),
        Value::Long(l)
        | Value::TimeMicros(l)
        | Value::TimestampMillis(l)
        | Value::TimestampMicros(l)
        | Value::LocalTimestampMillis(l)
        | Value::LocalTimestampMicros(l) => Ok(JsonValue::from(l)),
        Value::Float(f) => float_to_json(f64::from(f)),
        Value::Double(d) => float_to_json(d),
        Value::String(s) | Value::Enum(_, s) => Ok(JsonValue::String(s)),
        Value::Bytes(b) | Value::Fixed(_, b) => Ok(JsonValue::Array(
            b.into_iter().map(JsonValue::from).collect(),
        )),
        Value::Union(_, inner) => avro_to_json(*inner),
        Value::Array(items) => Ok(JsonValue::Array(
            items
                .into_iter()
                .map(avro_to_json)
                .collect::<Result<Vec<_>>>()?,
        )),
        Value::Map(entries) => {
            let mut object = Map::with_capacity(entries.len());
            for (key, entry) in entries {
                object.insert(key, avro_to_json(entry)?);
            }
            Ok(JsonValue::Object(object))
        }
        Value::Record(fields) => {
            let mut object = Map::with_capacity(fields.len());
            for (name, field) in fields {
                object.insert(name, avro_to_json(field)?);
            }
            Ok(JsonValue::Object(object))
        }
        other => Err(Error::Decode(format!(
            "unsupported Avro value {other:?}"
        ))),
    }
}

fn json_to_i32(value: &JsonValue, path: &str) -> Result<i32> {
    let n = json_to_i64(value, path).map_err(|_| mismatch(path, "int", value))?;
    i32::try_from(n).map_err(|_| Error::Encode(format!("{path}: {n} does not fit in an int")))
}

fn json_to_i64(value: &JsonValue, path: &str) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| mismatch(path, "long", value))
}

fn json_to_f64(value: &JsonValue, path: &str) -> Result<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64().ok_or_else(|| mismatch(path, "number", value)),
        other => Err(mismatch(path, "number", other)),
    }
}

fn json_to_octets(value: &JsonValue, path: &str) -> Result<Vec<u8>> {
    let items = value
        .as_array()
        .ok_or_else(|| mismatch(path, "array of octets", value))?;
    items
        .iter()
        .map(|item| {
            item.as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| mismatch(path, "octet", item))
        })
        .collect()
}

fn float_to_json(f: f64) -> Result<JsonValue> {
    Number::from_f64(f)
        .map(JsonValue::Number)
        .ok_or_else(|| Error::Decode(format!("non-finite float {f} has no textual form")))
}

fn mismatch(path: &str, expected: &str, actual: &JsonValue) -> Error {
    Error::Encode(format!(
        "{path}: expected {expected}, got {}",
        json_kind(actual)
    ))
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(n) if n.is_i64() || n.is_u64() => "integer",
        JsonValue::Number(_) => "float",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(schema: &str) -> Schema {
        Schema::parse_str(schema).expect("valid schema")
    }

    #[test]
    fn test_int_out_of_range_rejected() {
        let schema = parse(r#""int""#);
        let err = json_to_avro(&json!(i64::from(i32::MAX) + 1), &schema, "$").unwrap_err();
        assert!(matches!(err, Error::Encode(msg) if msg.contains("does not fit")));
    }

    #[test]
    fn test_string_for_int_rejected() {
        let schema = parse(r#""int""#);
        let err = json_to_avro(&json!("3"), &schema, "$.id").unwrap_err();
        assert!(matches!(err, Error::Encode(msg) if msg == "$.id: expected int, got string"));
    }

    #[test]
    fn test_nullable_union_picks_matching_branch() {
        let schema = parse(r#"["null", "string"]"#);

        let null = json_to_avro(&json!(null), &schema, "$").unwrap();
        assert_eq!(null, Value::Union(0, Box::new(Value::Null)));

        let text = json_to_avro(&json!("hi"), &schema, "$").unwrap();
        assert_eq!(text, Value::Union(1, Box::new(Value::String("hi".to_string()))));

        assert!(json_to_avro(&json!(1), &schema, "$").is_err());
    }

    #[test]
    fn test_record_default_fills_missing_field() {
        let schema = parse(
            r#"{
                "type": "record",
                "name": "Event",
                "fields": [
                    {"name": "id", "type": "long"},
                    {"name": "source", "type": "string", "default": "web"}
                ]
            }"#,
        );

        let value = json_to_avro(&json!({"id": 9}), &schema, "$").unwrap();
        assert_eq!(
            value,
            Value::Record(vec![
                ("id".to_string(), Value::Long(9)),
                ("source".to_string(), Value::String("web".to_string())),
            ])
        );
    }

    #[test]
    fn test_enum_symbol_checked() {
        let schema = parse(r#"{"type": "enum", "name": "Kind", "symbols": ["DEBIT", "CREDIT"]}"#);

        let credit = json_to_avro(&json!("CREDIT"), &schema, "$").unwrap();
        assert_eq!(credit, Value::Enum(1, "CREDIT".to_string()));

        assert!(json_to_avro(&json!("REFUND"), &schema, "$").is_err());
    }

    #[test]
    fn test_bytes_as_octet_array() {
        let schema = parse(r#""bytes""#);

        let value = json_to_avro(&json!([0, 127, 255]), &schema, "$").unwrap();
        assert_eq!(value, Value::Bytes(vec![0, 127, 255]));
        assert_eq!(avro_to_json(value).unwrap(), json!([0, 127, 255]));

        assert!(json_to_avro(&json!([256]), &schema, "$").is_err());
    }

    #[test]
    fn test_non_finite_float_has_no_textual_form() {
        assert!(matches!(
            avro_to_json(Value::Double(f64::NAN)),
            Err(Error::Decode(_))
        ));
    }
}
