//! Structured values

use std::collections::BTreeMap;

/// A value shaped by a [`DataType`](crate::schema::DataType).
///
/// Struct values are positional; field names come from the schema that
/// accompanies the value.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredValue {
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Binary(Vec<u8>),
    Date(i32),
    Timestamp(i64),
    Array(Vec<StructuredValue>),
    Map(BTreeMap<String, StructuredValue>),
    Struct(Vec<StructuredValue>),
}

impl StructuredValue {
    pub fn is_null(&self) -> bool {
        matches!(self, StructuredValue::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StructuredValue::Null => "null",
            StructuredValue::Boolean(_) => "boolean",
            StructuredValue::Integer(_) => "integer",
            StructuredValue::Long(_) => "long",
            StructuredValue::Float(_) => "float",
            StructuredValue::Double(_) => "double",
            StructuredValue::Text(_) => "text",
            StructuredValue::Binary(_) => "binary",
            StructuredValue::Date(_) => "date",
            StructuredValue::Timestamp(_) => "timestamp",
            StructuredValue::Array(_) => "array",
            StructuredValue::Map(_) => "map",
            StructuredValue::Struct(_) => "struct",
        }
    }
}

impl From<bool> for StructuredValue {
    fn from(v: bool) -> Self {
        StructuredValue::Boolean(v)
    }
}

impl From<i32> for StructuredValue {
    fn from(v: i32) -> Self {
        StructuredValue::Integer(v)
    }
}

impl From<i64> for StructuredValue {
    fn from(v: i64) -> Self {
        StructuredValue::Long(v)
    }
}

impl From<f32> for StructuredValue {
    fn from(v: f32) -> Self {
        StructuredValue::Float(v)
    }
}

impl From<f64> for StructuredValue {
    fn from(v: f64) -> Self {
        StructuredValue::Double(v)
    }
}

impl From<&str> for StructuredValue {
    fn from(v: &str) -> Self {
        StructuredValue::Text(v.to_string())
    }
}

impl From<String> for StructuredValue {
    fn from(v: String) -> Self {
        StructuredValue::Text(v)
    }
}

impl From<Vec<u8>> for StructuredValue {
    fn from(v: Vec<u8>) -> Self {
        StructuredValue::Binary(v)
    }
}

impl<T: Into<StructuredValue>> From<Option<T>> for StructuredValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(StructuredValue::Null)
    }
}
