//! Avro Registry Bridge
//!
//! Reads and writes Avro-encoded structured records whose schemas live in a
//! Confluent-compatible schema registry.
//!
//! ## Features
//!
//! - **Subject Naming**: Topic, record and topic-record naming strategies
//! - **Registry Client**: Register, look up and compatibility-check schemas
//! - **Schema Resolution**: Pick a schema by file, id, version or `latest`
//! - **Type Conversion**: Structured types and values to Avro and back
//! - **Wire Format**: Magic byte + schema id envelope around Avro payloads
//!
//! ## Architecture
//!
//! ```text
//! StructuredValue ──convert──▶ Avro Value ──wire──▶ [0x00][id][payload]
//!                                   ▲                     │
//!                          resolver / registry ◀── schema id
//! ```

pub mod checksum;
pub mod codec;
pub mod compatibility;
pub mod config;
pub mod convert;
pub mod error;
pub mod naming;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod value;
pub mod version;
pub mod wire;

pub use checksum::Checksum;
pub use codec::{RecordDecoder, RecordEncoder};
pub use compatibility::{CompatibilityChecker, CompatibilityResult};
pub use config::{RegistryConfig, RegistryOptions};
pub use convert::{
    decode_generic, deserialize_from_bytes, serialize_to_bytes, to_avro_type, to_structured_type,
    RootSchema,
};
pub use error::{Direction, RegistryError, Result};
pub use naming::{resolve_subject, RecordIdentity, SubjectNameStrategy, SubjectNaming};
pub use registry::{RegistryClient, RegistryEntry};
pub use schema::{DataType, SchemaType, StructField};
pub use value::StructuredValue;
pub use version::{SchemaSelector, VersionRef};
pub use wire::WireEnvelope;
