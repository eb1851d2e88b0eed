//! Avro value -> structured value

use std::collections::BTreeMap;

use apache_avro::types::Value;

use crate::error::{RegistryError, Result};
use crate::schema::{DataType, StructField};
use crate::value::StructuredValue;

/// Convert a decoded Avro value into a structured value shaped by
/// `data_type`.
///
/// Record fields are looked up by name. A field missing from the Avro record
/// reads as null when the structured field is nullable and is an error
/// otherwise.
pub fn deserialize(value: &Value, data_type: &DataType) -> Result<StructuredValue> {
    let mismatch = || RegistryError::type_mismatch(data_type.to_string(), value_kind(value));

    let structured = match (value, data_type) {
        (Value::Union(_, inner), _) => return deserialize(inner, data_type),
        (Value::Null, _) => StructuredValue::Null,

        (Value::Boolean(b), DataType::Boolean) => StructuredValue::Boolean(*b),

        (Value::Int(i), DataType::Integer) => StructuredValue::Integer(*i),
        (Value::Int(i), DataType::Long) => StructuredValue::Long(*i as i64),
        (Value::Long(l), DataType::Long) => StructuredValue::Long(*l),

        (Value::Float(f), DataType::Float) => StructuredValue::Float(*f),
        (Value::Float(f), DataType::Double) => StructuredValue::Double(*f as f64),
        (Value::Double(d), DataType::Double) => StructuredValue::Double(*d),

        (Value::String(s), DataType::Text) => StructuredValue::Text(s.clone()),
        (Value::Enum(_, symbol), DataType::Text) => StructuredValue::Text(symbol.clone()),

        (Value::Bytes(b), DataType::Binary { fixed_size })
        | (Value::Fixed(_, b), DataType::Binary { fixed_size }) => {
            if let Some(size) = fixed_size {
                if b.len() != *size {
                    return Err(RegistryError::SizeMismatch {
                        expected: *size,
                        actual: b.len(),
                    });
                }
            }
            StructuredValue::Binary(b.clone())
        }

        (Value::Date(d), DataType::Date) | (Value::Int(d), DataType::Date) => {
            StructuredValue::Date(*d)
        }

        (Value::TimestampMicros(t), DataType::Timestamp) | (Value::Long(t), DataType::Timestamp) => {
            StructuredValue::Timestamp(*t)
        }
        (Value::TimestampMillis(t), DataType::Timestamp) => {
            let micros = t.checked_mul(1000).ok_or_else(|| {
                RegistryError::type_mismatch("timestamp-millis within microsecond range", t.to_string())
            })?;
            StructuredValue::Timestamp(micros)
        }

        (
            Value::Array(items),
            DataType::Array {
                element,
                contains_null,
            },
        ) => StructuredValue::Array(
            items
                .iter()
                .map(|item| {
                    let v = deserialize(item, element)?;
                    if v.is_null() && !contains_null {
                        return Err(RegistryError::type_mismatch(
                            format!("non-null {} element", element),
                            "null",
                        ));
                    }
                    Ok(v)
                })
                .collect::<Result<Vec<_>>>()?,
        ),

        (
            Value::Map(entries),
            DataType::Map {
                value: value_type,
                value_contains_null,
                ..
            },
        ) => {
            let mut map = BTreeMap::new();
            for (k, v) in entries {
                let v = deserialize(v, value_type)?;
                if v.is_null() && !value_contains_null {
                    return Err(RegistryError::type_mismatch(
                        format!("non-null {} map value", value_type),
                        "null",
                    ));
                }
                map.insert(k.clone(), v);
            }
            StructuredValue::Map(map)
        }

        (Value::Record(avro_fields), DataType::Struct(fields)) => read_record(avro_fields, fields)?,

        _ => return Err(mismatch()),
    };
    Ok(structured)
}

fn read_record(avro_fields: &[(String, Value)], fields: &[StructField]) -> Result<StructuredValue> {
    let values = fields
        .iter()
        .map(|field| {
            let value = match avro_fields.iter().find(|(name, _)| *name == field.name) {
                Some((_, v)) => deserialize(v, &field.data_type)?,
                None => StructuredValue::Null,
            };
            if value.is_null() && !field.nullable {
                return Err(RegistryError::type_mismatch(
                    format!("non-null value for field '{}'", field.name),
                    "null",
                ));
            }
            Ok(value)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(StructuredValue::Struct(values))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Int(_) => "int",
        Value::Long(_) => "long",
        Value::Float(_) => "float",
        Value::Double(_) => "double",
        Value::Bytes(_) => "bytes",
        Value::String(_) => "string",
        Value::Fixed(..) => "fixed",
        Value::Enum(..) => "enum",
        Value::Union(..) => "union",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Record(_) => "record",
        Value::Date(_) => "date",
        Value::TimestampMillis(_) => "timestamp-millis",
        Value::TimestampMicros(_) => "timestamp-micros",
        _ => "logical",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_nullable_field_reads_null() {
        let dt = DataType::Struct(vec![
            StructField::required("id", DataType::Long),
            StructField::optional("added_later", DataType::Text),
        ]);
        let avro = Value::Record(vec![("id".to_string(), Value::Long(1))]);
        assert_eq!(
            deserialize(&avro, &dt).unwrap(),
            StructuredValue::Struct(vec![StructuredValue::Long(1), StructuredValue::Null])
        );
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let dt = DataType::Struct(vec![StructField::required("id", DataType::Long)]);
        let avro = Value::Record(vec![]);
        assert!(matches!(
            deserialize(&avro, &dt),
            Err(RegistryError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_timestamp_millis_scaled_to_micros() {
        let v = deserialize(&Value::TimestampMillis(1_500), &DataType::Timestamp).unwrap();
        assert_eq!(v, StructuredValue::Timestamp(1_500_000));
    }

    #[test]
    fn test_timestamp_millis_out_of_micros_range() {
        let err = deserialize(&Value::TimestampMillis(i64::MAX / 10), &DataType::Timestamp).unwrap_err();
        assert!(matches!(err, RegistryError::TypeMismatch { .. }));
        assert!(deserialize(&Value::TimestampMillis(i64::MIN / 10), &DataType::Timestamp).is_err());
    }

    #[test]
    fn test_enum_reads_as_text() {
        let v = deserialize(&Value::Enum(0, "RED".to_string()), &DataType::Text).unwrap();
        assert_eq!(v, StructuredValue::Text("RED".to_string()));
    }

    #[test]
    fn test_kind_mismatch() {
        assert!(matches!(
            deserialize(&Value::String("x".into()), &DataType::Integer),
            Err(RegistryError::TypeMismatch { .. })
        ));
    }
}
