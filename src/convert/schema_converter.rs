//! Structured <-> Avro schema translation

use std::collections::{HashMap, HashSet};

use apache_avro::schema::{EnumSchema, FixedSchema, Name, RecordSchema, Schema};
use serde_json::{json, Map, Value as JsonValue};

use crate::error::{RegistryError, Result};
use crate::schema::{DataType, SchemaType, StructField};

use super::{collect_names, fullname, schema_kind};

/// Translate a structured type into an Avro schema.
///
/// `record_name` and `namespace` name the top-level record (or fixed). Nested
/// named types take the field name as their name and
/// `namespace.record_name` as their namespace, so every full name in the tree
/// is unique. Nullable positions become `["null", T]` unions.
pub fn to_avro_type(
    data_type: &DataType,
    nullable: bool,
    record_name: &str,
    namespace: &str,
) -> Result<Schema> {
    let json = nullable_json(avro_json(data_type, record_name, namespace)?, nullable);
    Schema::parse(&json).map_err(|e| RegistryError::SchemaParse(e.to_string()))
}

/// Translate an Avro schema into a structured type.
///
/// Fails on unions that are not `[T]`, `["null", T]` or `[T, "null"]`, on
/// recursive named types and on Avro kinds with no structured counterpart.
pub fn to_structured_type(schema: &Schema) -> Result<SchemaType> {
    let mut named = HashMap::new();
    collect_names(schema, &mut named);
    StructuredTranslator {
        named: &named,
        visiting: HashSet::new(),
    }
    .translate(schema)
}

fn nullable_json(inner: JsonValue, nullable: bool) -> JsonValue {
    if nullable {
        json!(["null", inner])
    } else {
        inner
    }
}

fn avro_json(data_type: &DataType, name: &str, namespace: &str) -> Result<JsonValue> {
    let json = match data_type {
        DataType::Integer => json!("int"),
        DataType::Long => json!("long"),
        DataType::Float => json!("float"),
        DataType::Double => json!("double"),
        DataType::Boolean => json!("boolean"),
        DataType::Text => json!("string"),
        DataType::Binary { fixed_size: None } => json!("bytes"),
        DataType::Binary {
            fixed_size: Some(size),
        } => {
            let mut fixed = named_json("fixed", name, namespace);
            fixed.insert("size".to_string(), json!(size));
            JsonValue::Object(fixed)
        }
        DataType::Date => json!({"type": "int", "logicalType": "date"}),
        DataType::Timestamp => json!({"type": "long", "logicalType": "timestamp-micros"}),
        DataType::Array {
            element,
            contains_null,
        } => json!({
            "type": "array",
            "items": nullable_json(avro_json(element, name, namespace)?, *contains_null),
        }),
        DataType::Map {
            key,
            value,
            value_contains_null,
        } => {
            if **key != DataType::Text {
                return Err(RegistryError::UnsupportedKeyType(format!(
                    "Avro maps are keyed by string, found {}",
                    key
                )));
            }
            json!({
                "type": "map",
                "values": nullable_json(avro_json(value, name, namespace)?, *value_contains_null),
            })
        }
        DataType::Struct(fields) => {
            let child_namespace = if namespace.is_empty() {
                name.to_string()
            } else {
                format!("{}.{}", namespace, name)
            };
            let fields = fields
                .iter()
                .map(|f| field_json(f, &child_namespace))
                .collect::<Result<Vec<_>>>()?;
            let mut record = named_json("record", name, namespace);
            record.insert("fields".to_string(), JsonValue::Array(fields));
            JsonValue::Object(record)
        }
    };
    Ok(json)
}

fn named_json(kind: &str, name: &str, namespace: &str) -> Map<String, JsonValue> {
    let mut obj = Map::new();
    obj.insert("type".to_string(), json!(kind));
    obj.insert("name".to_string(), json!(name));
    if !namespace.is_empty() {
        obj.insert("namespace".to_string(), json!(namespace));
    }
    obj
}

fn field_json(field: &StructField, namespace: &str) -> Result<JsonValue> {
    let inner = avro_json(&field.data_type, &field.name, namespace)?;
    let mut obj = Map::new();
    obj.insert("name".to_string(), json!(field.name));
    obj.insert("type".to_string(), nullable_json(inner, field.nullable));
    if field.nullable {
        obj.insert("default".to_string(), JsonValue::Null);
    }
    Ok(JsonValue::Object(obj))
}

struct StructuredTranslator<'a> {
    named: &'a HashMap<String, Schema>,
    visiting: HashSet<String>,
}

impl StructuredTranslator<'_> {
    fn translate(&mut self, schema: &Schema) -> Result<SchemaType> {
        let data_type = match schema {
            Schema::Boolean => DataType::Boolean,
            Schema::Int => DataType::Integer,
            Schema::Long => DataType::Long,
            Schema::Float => DataType::Float,
            Schema::Double => DataType::Double,
            Schema::String => DataType::Text,
            Schema::Bytes => DataType::binary(),
            Schema::Date => DataType::Date,
            Schema::TimestampMillis | Schema::TimestampMicros => DataType::Timestamp,
            Schema::Fixed(FixedSchema { size, .. }) => DataType::fixed(*size),
            Schema::Enum(EnumSchema { .. }) => DataType::Text,
            Schema::Array(items) => {
                let element = self.translate(items)?;
                DataType::array(element.data_type, element.nullable)
            }
            Schema::Map(values) => {
                let value = self.translate(values)?;
                DataType::map(value.data_type, value.nullable)
            }
            Schema::Union(union) => return self.translate_union(union.variants()),
            Schema::Record(record) => self.translate_record(record)?,
            Schema::Ref { name } => return self.translate_ref(name),
            other => {
                return Err(RegistryError::UnsupportedType(format!(
                    "Avro type '{}' has no structured equivalent",
                    schema_kind(other)
                )))
            }
        };
        Ok(SchemaType::new(data_type, false))
    }

    fn translate_union(&mut self, variants: &[Schema]) -> Result<SchemaType> {
        match variants {
            [single] => self.translate(single),
            [Schema::Null, other] | [other, Schema::Null] if !matches!(other, Schema::Null) => {
                let inner = self.translate(other)?;
                Ok(SchemaType::new(inner.data_type, true))
            }
            _ => {
                let branches: Vec<&str> = variants.iter().map(schema_kind).collect();
                Err(RegistryError::UnsupportedUnion(format!(
                    "[{}]: only [\"null\", T] unions are supported",
                    branches.join(", ")
                )))
            }
        }
    }

    fn translate_record(&mut self, record: &RecordSchema) -> Result<DataType> {
        let full = fullname(&record.name);
        if !self.visiting.insert(full.clone()) {
            return Err(RegistryError::UnsupportedType(format!(
                "recursive record '{}'",
                full
            )));
        }
        let fields = record
            .fields
            .iter()
            .map(|f| {
                let t = self.translate(&f.schema)?;
                Ok(StructField::new(f.name.clone(), t.data_type, t.nullable))
            })
            .collect::<Result<Vec<_>>>();
        self.visiting.remove(&full);
        Ok(DataType::Struct(fields?))
    }

    fn translate_ref(&mut self, name: &Name) -> Result<SchemaType> {
        let full = fullname(name);
        if self.visiting.contains(&full) {
            return Err(RegistryError::UnsupportedType(format!(
                "recursive record '{}'",
                full
            )));
        }
        let target = self.named.get(&full).ok_or_else(|| {
            RegistryError::UnsupportedType(format!("unresolved type reference '{}'", full))
        })?;
        self.translate(target)
    }
}
