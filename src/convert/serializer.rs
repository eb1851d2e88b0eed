//! Structured value -> Avro value

use std::collections::HashMap;

use apache_avro::schema::{EnumSchema, FixedSchema, RecordSchema, Schema, UnionSchema};
use apache_avro::types::Value;

use crate::error::{RegistryError, Result};
use crate::schema::{DataType, StructField};
use crate::value::StructuredValue;

use super::{collect_names, fullname, schema_kind};

/// Convert `value`, typed by `data_type`, into an Avro value valid for
/// `schema`.
///
/// Records are matched by field name and emitted in Avro field order. A
/// binary value written to a `fixed` of a different size is rejected with
/// [`RegistryError::SizeMismatch`] rather than padded or truncated.
pub fn serialize(
    value: &StructuredValue,
    data_type: &DataType,
    nullable: bool,
    schema: &Schema,
) -> Result<Value> {
    let mut named = HashMap::new();
    collect_names(schema, &mut named);
    let serializer = Serializer { named: &named };
    if value.is_null() && !nullable {
        return Err(RegistryError::type_mismatch(data_type.type_name(), "null"));
    }
    serializer.write(value, data_type, schema)
}

struct Serializer<'a> {
    named: &'a HashMap<String, Schema>,
}

impl Serializer<'_> {
    fn resolve<'s>(&'s self, schema: &'s Schema) -> Result<&'s Schema> {
        match schema {
            Schema::Ref { name } => {
                let full = fullname(name);
                self.named.get(&full).ok_or_else(|| {
                    RegistryError::UnsupportedType(format!("unresolved type reference '{}'", full))
                })
            }
            other => Ok(other),
        }
    }

    fn write(&self, value: &StructuredValue, data_type: &DataType, schema: &Schema) -> Result<Value> {
        let schema = self.resolve(schema)?;
        if let Schema::Union(union) = schema {
            return self.write_union(value, data_type, union);
        }

        let mismatch = || RegistryError::type_mismatch(schema_kind(schema), value.kind());

        let avro = match (data_type, value, schema) {
            (_, StructuredValue::Null, Schema::Null) => Value::Null,
            (_, StructuredValue::Null, _) => {
                return Err(RegistryError::type_mismatch(schema_kind(schema), "null"))
            }

            (DataType::Boolean, StructuredValue::Boolean(b), Schema::Boolean) => Value::Boolean(*b),

            (DataType::Integer, StructuredValue::Integer(i), Schema::Int) => Value::Int(*i),
            (DataType::Integer, StructuredValue::Integer(i), Schema::Long) => Value::Long(*i as i64),
            (DataType::Long, StructuredValue::Long(l), Schema::Long) => Value::Long(*l),

            (DataType::Float, StructuredValue::Float(f), Schema::Float) => Value::Float(*f),
            (DataType::Float, StructuredValue::Float(f), Schema::Double) => Value::Double(*f as f64),
            (DataType::Double, StructuredValue::Double(d), Schema::Double) => Value::Double(*d),

            (DataType::Text, StructuredValue::Text(s), Schema::String) => Value::String(s.clone()),
            (DataType::Text, StructuredValue::Text(s), Schema::Enum(EnumSchema { name, symbols, .. })) => {
                let index = symbols.iter().position(|sym| sym == s).ok_or_else(|| {
                    RegistryError::type_mismatch(
                        format!("symbol of enum '{}'", fullname(name)),
                        format!("'{}'", s),
                    )
                })?;
                Value::Enum(index as u32, s.clone())
            }

            (DataType::Binary { .. }, StructuredValue::Binary(b), Schema::Bytes) => Value::Bytes(b.clone()),
            (DataType::Binary { .. }, StructuredValue::Binary(b), Schema::Fixed(FixedSchema { size, .. })) => {
                if b.len() != *size {
                    return Err(RegistryError::SizeMismatch {
                        expected: *size,
                        actual: b.len(),
                    });
                }
                Value::Fixed(*size, b.clone())
            }

            (DataType::Date, StructuredValue::Date(d), Schema::Date) => Value::Date(*d),
            (DataType::Date, StructuredValue::Date(d), Schema::Int) => Value::Int(*d),

            (DataType::Timestamp, StructuredValue::Timestamp(t), Schema::TimestampMicros) => {
                Value::TimestampMicros(*t)
            }
            (DataType::Timestamp, StructuredValue::Timestamp(t), Schema::TimestampMillis) => {
                Value::TimestampMillis(t.div_euclid(1000))
            }
            (DataType::Timestamp, StructuredValue::Timestamp(t), Schema::Long) => Value::Long(*t),

            (
                DataType::Array { element, .. },
                StructuredValue::Array(items),
                Schema::Array(item_schema),
            ) => Value::Array(
                items
                    .iter()
                    .map(|item| self.write(item, element, item_schema))
                    .collect::<Result<Vec<_>>>()?,
            ),

            (DataType::Map { value: value_type, .. }, StructuredValue::Map(entries), Schema::Map(value_schema)) => {
                Value::Map(
                    entries
                        .iter()
                        .map(|(k, v)| Ok((k.clone(), self.write(v, value_type, value_schema)?)))
                        .collect::<Result<HashMap<_, _>>>()?,
                )
            }

            (DataType::Struct(fields), StructuredValue::Struct(values), Schema::Record(record)) => {
                self.write_record(fields, values, record)?
            }

            _ => return Err(mismatch()),
        };
        Ok(avro)
    }

    fn write_union(
        &self,
        value: &StructuredValue,
        data_type: &DataType,
        union: &UnionSchema,
    ) -> Result<Value> {
        let variants = union.variants();
        let null_index = variants.iter().position(|v| matches!(v, Schema::Null));

        if value.is_null() {
            let index = null_index
                .ok_or_else(|| RegistryError::type_mismatch("non-null union", "null"))?;
            return Ok(Value::Union(index as u32, Box::new(Value::Null)));
        }

        let index = match (variants.len(), null_index) {
            (1, None) => 0,
            (2, Some(n)) => 1 - n,
            _ => {
                let branches: Vec<&str> = variants.iter().map(schema_kind).collect();
                return Err(RegistryError::UnsupportedUnion(format!(
                    "[{}]: only [\"null\", T] unions are supported",
                    branches.join(", ")
                )));
            }
        };
        let inner = self.write(value, data_type, &variants[index])?;
        Ok(Value::Union(index as u32, Box::new(inner)))
    }

    fn write_record(
        &self,
        fields: &[StructField],
        values: &[StructuredValue],
        record: &RecordSchema,
    ) -> Result<Value> {
        if fields.len() != values.len() {
            return Err(RegistryError::type_mismatch(
                format!("{} struct values", fields.len()),
                format!("{}", values.len()),
            ));
        }
        if let Some(extra) = fields
            .iter()
            .find(|f| !record.fields.iter().any(|rf| rf.name == f.name))
        {
            return Err(RegistryError::type_mismatch(
                format!("field '{}' in record '{}'", extra.name, fullname(&record.name)),
                "no such Avro field",
            ));
        }

        let mut out = Vec::with_capacity(record.fields.len());
        for avro_field in &record.fields {
            let position = fields.iter().position(|f| f.name == avro_field.name);
            let field_value = match position {
                Some(i) => {
                    let field = &fields[i];
                    if values[i].is_null() && !field.nullable {
                        return Err(RegistryError::type_mismatch(
                            format!("non-null value for field '{}'", field.name),
                            "null",
                        ));
                    }
                    self.write(&values[i], &field.data_type, &avro_field.schema)?
                }
                // absent from the struct: only a nullable Avro field can be filled in
                None => match self.resolve(&avro_field.schema)? {
                    Schema::Union(union) => self.write_union(
                        &StructuredValue::Null,
                        &DataType::binary(),
                        union,
                    )?,
                    _ => {
                        return Err(RegistryError::type_mismatch(
                            format!("value for Avro field '{}'", avro_field.name),
                            "missing",
                        ))
                    }
                },
            };
            out.push((avro_field.name.clone(), field_value));
        }
        Ok(Value::Record(out))
    }
}
