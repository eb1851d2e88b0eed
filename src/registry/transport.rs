//! Transport seam between the client facade and a concrete registry

use apache_avro::Schema;
use thiserror::Error;

use crate::version::VersionRef;

/// A schema registered under a subject
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub subject: String,
    /// Registry-wide schema id
    pub id: i32,
    /// Version within the subject, starting at 1
    pub version: i32,
    pub schema: Schema,
}

/// Failures reported by a transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("rejected ({status}, code {code}): {message}")]
    Rejected {
        status: u16,
        code: i32,
        message: String,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid registry response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::NotFound(_))
    }
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Operations a schema registry backend provides
pub trait RegistryTransport: Send + Sync {
    /// Register `schema` under `subject`, returning its id.
    fn register(&self, subject: &str, schema: &Schema) -> TransportResult<i32>;

    /// Schema with `id`; when `subject` is given the schema must be
    /// registered under it.
    fn schema_by_id(&self, id: i32, subject: Option<&str>) -> TransportResult<Schema>;

    fn subject_version(&self, subject: &str, version: VersionRef) -> TransportResult<RegistryEntry>;

    /// All versions of `subject`, ascending
    fn versions(&self, subject: &str) -> TransportResult<Vec<i32>>;

    /// Whether `schema` can be registered after the latest version of
    /// `subject`. A subject with no versions accepts anything.
    fn test_compatibility(&self, subject: &str, schema: &Schema) -> TransportResult<bool>;
}
