//! Type conversion engine
//!
//! Maps structured schemas and values onto Avro schemas and values, and back.
//!
//! ```text
//! DataType ──to_avro_type──────▶ apache_avro::Schema
//!          ◀─to_structured_type─
//!
//! StructuredValue ──serialize───▶ apache_avro::types::Value ──datum──▶ bytes
//!                 ◀─deserialize──                           ◀─datum───
//! ```
//!
//! Every translation is an exhaustive match over the closed type enums, so a
//! new kind on either side has to be handled explicitly.

mod deserializer;
mod root;
mod schema_converter;
mod serializer;

use std::collections::HashMap;
use std::io::Cursor;

use apache_avro::schema::{EnumSchema, FixedSchema, Name, RecordSchema, Schema};
use apache_avro::types::Value;

use crate::error::Result;
use crate::schema::DataType;
use crate::value::StructuredValue;

pub use deserializer::deserialize;
pub use root::{RootSchema, ROOT_FIELD};
pub(crate) use root::unwrap_root;
pub use schema_converter::{to_avro_type, to_structured_type};
pub use serializer::serialize;

/// Serialize a structured value into headerless Avro binary.
///
/// The value is fully converted before anything is written, so a conversion
/// error leaves no partial output behind.
pub fn serialize_to_bytes(
    value: &StructuredValue,
    data_type: &DataType,
    nullable: bool,
    schema: &Schema,
) -> Result<Vec<u8>> {
    let avro = serialize(value, data_type, nullable, schema)?;
    Ok(apache_avro::to_avro_datum(schema, avro)?)
}

/// Decode headerless Avro binary into a structured value.
///
/// Without a `data_type` the structured shape is derived from `schema`.
pub fn deserialize_from_bytes(
    bytes: &[u8],
    schema: &Schema,
    data_type: Option<&DataType>,
) -> Result<StructuredValue> {
    let generic = decode_generic(bytes, schema)?;
    match data_type {
        Some(dt) => deserialize(&generic, dt),
        None => {
            let derived = to_structured_type(schema)?;
            deserialize(&generic, &derived.data_type)
        }
    }
}

/// Decode headerless Avro binary into a generic Avro value.
pub fn decode_generic(bytes: &[u8], schema: &Schema) -> Result<Value> {
    let mut cursor = Cursor::new(bytes);
    Ok(apache_avro::from_avro_datum(schema, &mut cursor, None)?)
}

/// Collect every named type in `schema`, keyed by full name.
pub(crate) fn collect_names(schema: &Schema, names: &mut HashMap<String, Schema>) {
    match schema {
        Schema::Record(RecordSchema { name, fields, .. }) => {
            names.insert(fullname(name), schema.clone());
            for field in fields {
                collect_names(&field.schema, names);
            }
        }
        Schema::Enum(EnumSchema { name, .. }) | Schema::Fixed(FixedSchema { name, .. }) => {
            names.insert(fullname(name), schema.clone());
        }
        Schema::Array(inner) | Schema::Map(inner) => collect_names(inner, names),
        Schema::Union(union) => {
            for variant in union.variants() {
                collect_names(variant, names);
            }
        }
        _ => {}
    }
}

pub(crate) fn fullname(name: &Name) -> String {
    match name.namespace.as_deref() {
        Some(ns) if !ns.is_empty() => format!("{}.{}", ns, name.name),
        _ => name.name.clone(),
    }
}

pub(crate) fn schema_kind(schema: &Schema) -> &'static str {
    match schema {
        Schema::Null => "null",
        Schema::Boolean => "boolean",
        Schema::Int => "int",
        Schema::Long => "long",
        Schema::Float => "float",
        Schema::Double => "double",
        Schema::Bytes => "bytes",
        Schema::String => "string",
        Schema::Array(_) => "array",
        Schema::Map(_) => "map",
        Schema::Union(_) => "union",
        Schema::Record(_) => "record",
        Schema::Enum(_) => "enum",
        Schema::Fixed(_) => "fixed",
        Schema::Date => "date",
        Schema::TimestampMillis => "timestamp-millis",
        Schema::TimestampMicros => "timestamp-micros",
        Schema::Ref { .. } => "reference",
        _ => "logical",
    }
}
