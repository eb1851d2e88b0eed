//! Record encoders and decoders
//!
//! [`RecordEncoder`] turns structured values into Avro bytes, framed with the
//! registry id of the writer schema when registry integration is on.
//! [`RecordDecoder`] reverses that, looking writer schemas up by id.

use std::collections::HashMap;

use apache_avro::types::Value;
use apache_avro::Schema;
use parking_lot::RwLock;

use crate::config::{keys, RegistryConfig};
use crate::convert::{self, RootSchema};
use crate::error::{Direction, RegistryError, Result};
use crate::registry::RegistryClient;
use crate::resolver;
use crate::schema::DataType;
use crate::value::StructuredValue;
use crate::wire;

/// Root record name used when none is configured
pub const DEFAULT_RECORD_NAME: &str = "topLevelRecord";

struct Registration<'a> {
    client: &'a RegistryClient,
    subject: String,
    schema_id: Option<i32>,
}

/// Encodes structured values of one type
pub struct RecordEncoder<'a> {
    data_type: DataType,
    root: RootSchema,
    registration: Option<Registration<'a>>,
}

impl<'a> RecordEncoder<'a> {
    /// Encoder that registers its schema and frames every record.
    ///
    /// The schema is registered on the first [`encode`](Self::encode).
    pub fn new(
        client: &'a RegistryClient,
        config: &RegistryConfig,
        direction: Direction,
        data_type: DataType,
    ) -> Result<Self> {
        let name = config
            .get(&keys::record_name(direction))
            .unwrap_or(DEFAULT_RECORD_NAME);
        let namespace = config
            .get(&keys::record_namespace(direction))
            .unwrap_or_default();
        let root = RootSchema::for_type(&data_type, false, name, namespace)?;

        let options = config.registry_options().map_err(|e| match e {
            RegistryError::Configuration { message, .. } => {
                RegistryError::configuration(message, direction)
            }
            other => other,
        })?;
        client.configure(&options)?;
        let subject = resolver::resolve_subject(config, direction, Some(root.schema()))?;

        Ok(Self {
            data_type,
            root,
            registration: Some(Registration {
                client,
                subject,
                schema_id: None,
            }),
        })
    }

    /// Encoder producing plain Avro binary with no registry involved
    pub fn without_registry(data_type: DataType, record_name: &str, namespace: &str) -> Result<Self> {
        let root = RootSchema::for_type(&data_type, false, record_name, namespace)?;
        Ok(Self {
            data_type,
            root,
            registration: None,
        })
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// The Avro writer schema
    pub fn schema(&self) -> &Schema {
        self.root.schema()
    }

    pub fn subject(&self) -> Option<&str> {
        self.registration.as_ref().map(|r| r.subject.as_str())
    }

    /// Registry id of the writer schema, once registered
    pub fn schema_id(&self) -> Option<i32> {
        self.registration.as_ref().and_then(|r| r.schema_id)
    }

    pub fn encode(&mut self, value: &StructuredValue) -> Result<Vec<u8>> {
        let wrapped = self.root.wrap_value(value.clone());
        let avro = convert::serialize(&wrapped, self.root.record_type(), false, self.root.schema())?;

        let schema_id = match self.registration.as_mut() {
            Some(registration) => Some(Self::ensure_registered(registration, self.root.schema())?),
            None => None,
        };
        wire::encode(&avro, self.root.schema(), schema_id)
    }

    fn ensure_registered(registration: &mut Registration<'a>, schema: &Schema) -> Result<i32> {
        if let Some(id) = registration.schema_id {
            return Ok(id);
        }
        let id = registration
            .client
            .register_schema(schema, &registration.subject)?;
        tracing::info!(subject = %registration.subject, schema_id = id, "Writer schema registered");
        registration.schema_id = Some(id);
        Ok(id)
    }
}

enum SchemaSource<'a> {
    Registry {
        client: &'a RegistryClient,
        cache: RwLock<HashMap<i32, Schema>>,
    },
    Fixed(Schema),
}

/// Decodes records into structured values
pub struct RecordDecoder<'a> {
    source: SchemaSource<'a>,
    reader_type: Option<DataType>,
}

impl<'a> RecordDecoder<'a> {
    /// Decoder for framed records whose writer schema lives in the registry
    pub fn new(client: &'a RegistryClient) -> Self {
        Self {
            source: SchemaSource::Registry {
                client,
                cache: RwLock::new(HashMap::new()),
            },
            reader_type: None,
        }
    }

    /// Decoder for plain Avro payloads written with `schema`
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            source: SchemaSource::Fixed(schema),
            reader_type: None,
        }
    }

    /// Shape decoded values as `data_type` instead of deriving it from the
    /// writer schema.
    pub fn with_reader_type(mut self, data_type: DataType) -> Self {
        self.reader_type = Some(data_type);
        self
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<StructuredValue> {
        let (schema, payload) = self.writer_schema(bytes)?;
        let generic = wire::decode(payload, &schema)?;

        match &self.reader_type {
            Some(data_type) if matches!(schema, Schema::Record(_)) => {
                let (record_type, wrapped) = RootSchema::record_type_for(data_type, false);
                let value = convert::deserialize(&generic, &record_type)?;
                convert::unwrap_root(value, wrapped)
            }
            Some(data_type) => convert::deserialize(&generic, data_type),
            None => {
                let derived = convert::to_structured_type(&schema)?;
                convert::deserialize(&generic, &derived.data_type)
            }
        }
    }

    /// Decode to the generic Avro value, field names included
    pub fn decode_generic(&self, bytes: &[u8]) -> Result<Value> {
        let (schema, payload) = self.writer_schema(bytes)?;
        wire::decode(payload, &schema)
    }

    fn writer_schema<'b>(&self, bytes: &'b [u8]) -> Result<(Schema, &'b [u8])> {
        match &self.source {
            SchemaSource::Fixed(schema) => Ok((schema.clone(), bytes)),
            SchemaSource::Registry { client, cache } => {
                let (id, payload) = wire::unframe(bytes)?;
                if let Some(schema) = cache.read().get(&id) {
                    return Ok((schema.clone(), payload));
                }
                let schema = client
                    .get_by_id(id)
                    .ok_or_else(|| RegistryError::SchemaNotFound(format!("schema id {}", id)))?;
                tracing::debug!(schema_id = id, "Cached writer schema");
                cache.write().insert(id, schema.clone());
                Ok((schema, payload))
            }
        }
    }
}
