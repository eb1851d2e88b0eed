//! Error types for registry-backed Avro encoding

use std::fmt;

use thiserror::Error;

/// Result type for registry and conversion operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Which side of a keyed record a setting applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Key,
    Value,
}

impl Direction {
    /// Prefix used by per-direction configuration keys
    pub fn prefix(&self) -> &'static str {
        match self {
            Direction::Key => "key",
            Direction::Value => "value",
        }
    }

    pub fn is_key(&self) -> bool {
        matches!(self, Direction::Key)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Registry, resolution and conversion errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Configuration error ({direction}): {message}")]
    Configuration { message: String, direction: Direction },

    #[error("Schema registry client is not configured")]
    RegistryUnavailable,

    #[error("Schema registry rejected the request: {0}")]
    RegistryRejected(String),

    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    #[error("Could not resolve subject: {0}")]
    SubjectResolution(String),

    #[error("Invalid Avro schema: {0}")]
    SchemaParse(String),

    #[error("Unsupported union: {0}")]
    UnsupportedUnion(String),

    #[error("Unsupported map key type: {0}")]
    UnsupportedKeyType(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("Fixed size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Invalid wire format: {0}")]
    InvalidWireFormat(String),

    #[error("Avro error: {0}")]
    Avro(#[from] apache_avro::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegistryError {
    pub(crate) fn configuration(message: impl Into<String>, direction: Direction) -> Self {
        RegistryError::Configuration {
            message: message.into(),
            direction,
        }
    }

    pub(crate) fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        RegistryError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}
