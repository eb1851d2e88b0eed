//! Root wrapper for non-record top-level types
//!
//! Registry subjects derived from a record name need the root schema to be a
//! named record. A top-level type that is not a non-nullable struct is wrapped
//! in a synthetic record with a single field, [`ROOT_FIELD`].

use apache_avro::Schema;

use crate::error::{RegistryError, Result};
use crate::schema::{DataType, StructField};
use crate::value::StructuredValue;

use super::to_avro_type;

/// Name of the single field of a wrapping root record
pub const ROOT_FIELD: &str = "value";

/// Avro root schema for a structured type, wrapped when necessary
#[derive(Debug, Clone)]
pub struct RootSchema {
    schema: Schema,
    record_type: DataType,
    wrapped: bool,
}

impl RootSchema {
    /// Build the root record for `data_type` named `record_name` in `namespace`.
    pub fn for_type(
        data_type: &DataType,
        nullable: bool,
        record_name: &str,
        namespace: &str,
    ) -> Result<Self> {
        let (record_type, wrapped) = Self::record_type_for(data_type, nullable);
        let schema = to_avro_type(&record_type, false, record_name, namespace)?;
        Ok(Self {
            schema,
            record_type,
            wrapped,
        })
    }

    /// The struct type actually encoded at the root, and whether it wraps
    /// `data_type`.
    pub fn record_type_for(data_type: &DataType, nullable: bool) -> (DataType, bool) {
        if data_type.is_struct() && !nullable {
            (data_type.clone(), false)
        } else {
            let wrapper = DataType::Struct(vec![StructField::new(
                ROOT_FIELD,
                data_type.clone(),
                nullable,
            )]);
            (wrapper, true)
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn record_type(&self) -> &DataType {
        &self.record_type
    }

    pub fn is_wrapped(&self) -> bool {
        self.wrapped
    }

    pub fn wrap_value(&self, value: StructuredValue) -> StructuredValue {
        if self.wrapped {
            StructuredValue::Struct(vec![value])
        } else {
            value
        }
    }

    pub fn unwrap_value(&self, value: StructuredValue) -> Result<StructuredValue> {
        unwrap_root(value, self.wrapped)
    }
}

pub(crate) fn unwrap_root(value: StructuredValue, wrapped: bool) -> Result<StructuredValue> {
    if !wrapped {
        return Ok(value);
    }
    match value {
        StructuredValue::Struct(mut fields) if fields.len() == 1 => Ok(fields.remove(0)),
        other => Err(RegistryError::type_mismatch(
            format!("single-field '{}' root record", ROOT_FIELD),
            other.kind(),
        )),
    }
}
