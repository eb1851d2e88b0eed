//! Structured (host-side) schema types
//!
//! `DataType` is the schema vocabulary the host engine speaks. It is shaped
//! like an Avro schema tree, but nullability is a flag on the enclosing field,
//! array or map instead of a `["null", T]` union.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Structured data type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    Text,
    /// Raw bytes. A declared size maps to an Avro `fixed`, otherwise `bytes`.
    Binary {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fixed_size: Option<usize>,
    },
    /// Days since the Unix epoch
    Date,
    /// Microseconds since the Unix epoch
    Timestamp,
    Array {
        element: Box<DataType>,
        contains_null: bool,
    },
    /// Keys must be `Text`; anything else fails Avro translation.
    Map {
        key: Box<DataType>,
        value: Box<DataType>,
        value_contains_null: bool,
    },
    Struct(Vec<StructField>),
}

impl DataType {
    pub fn binary() -> Self {
        DataType::Binary { fixed_size: None }
    }

    pub fn fixed(size: usize) -> Self {
        DataType::Binary {
            fixed_size: Some(size),
        }
    }

    pub fn array(element: DataType, contains_null: bool) -> Self {
        DataType::Array {
            element: Box::new(element),
            contains_null,
        }
    }

    /// Map keyed by text
    pub fn map(value: DataType, value_contains_null: bool) -> Self {
        DataType::Map {
            key: Box::new(DataType::Text),
            value: Box::new(value),
            value_contains_null,
        }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, DataType::Struct(_))
    }

    /// Short name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::Integer => "integer",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Boolean => "boolean",
            DataType::Text => "text",
            DataType::Binary { fixed_size: None } => "binary",
            DataType::Binary { fixed_size: Some(_) } => "fixed binary",
            DataType::Date => "date",
            DataType::Timestamp => "timestamp",
            DataType::Array { .. } => "array",
            DataType::Map { .. } => "map",
            DataType::Struct(_) => "struct",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Binary {
                fixed_size: Some(size),
            } => write!(f, "binary({})", size),
            DataType::Array { element, .. } => write!(f, "array<{}>", element),
            DataType::Map { key, value, .. } => write!(f, "map<{}, {}>", key, value),
            DataType::Struct(fields) => {
                write!(f, "struct<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.data_type)?;
                }
                write!(f, ">")
            }
            other => f.write_str(other.type_name()),
        }
    }
}

/// A named, possibly nullable, member of a struct
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub nullable: bool,
}

impl StructField {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }

    /// Non-nullable field
    pub fn required(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, data_type, false)
    }

    /// Nullable field
    pub fn optional(name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(name, data_type, true)
    }
}

/// A data type together with its top-level nullability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaType {
    pub data_type: DataType,
    pub nullable: bool,
}

impl SchemaType {
    pub fn new(data_type: DataType, nullable: bool) -> Self {
        Self {
            data_type,
            nullable,
        }
    }
}
