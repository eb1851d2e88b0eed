//! Subject naming strategies
//!
//! A subject names a lineage of schema versions in the registry. It is always
//! derived from the topic, the direction and the schema's record identity,
//! never made up by the caller.

use std::fmt;
use std::str::FromStr;

use apache_avro::schema::{EnumSchema, FixedSchema, Name, RecordSchema};
use apache_avro::Schema;
use serde::{Deserialize, Serialize};

use crate::config::{keys, RegistryConfig};
use crate::error::{Direction, RegistryError, Result};

/// How a subject is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectNameStrategy {
    /// `<topic>-key` / `<topic>-value`
    TopicName,
    /// `<namespace>.<name>`
    RecordName,
    /// `<topic>-<namespace>.<name>`
    TopicRecordName,
}

impl fmt::Display for SubjectNameStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectNameStrategy::TopicName => write!(f, "topic.name"),
            SubjectNameStrategy::RecordName => write!(f, "record.name"),
            SubjectNameStrategy::TopicRecordName => write!(f, "topic.record.name"),
        }
    }
}

impl FromStr for SubjectNameStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let short = s.rsplit('.').next().unwrap_or(s);
        match s.to_lowercase().as_str() {
            "topic.name" | "topic_name" => return Ok(Self::TopicName),
            "record.name" | "record_name" => return Ok(Self::RecordName),
            "topic.record.name" | "topic_record_name" => return Ok(Self::TopicRecordName),
            _ => {}
        }
        // Confluent class names, optionally package-qualified
        match short {
            "TopicNameStrategy" => Ok(Self::TopicName),
            "RecordNameStrategy" => Ok(Self::RecordName),
            "TopicRecordNameStrategy" => Ok(Self::TopicRecordName),
            _ => Err(format!("unknown naming strategy '{}'", s)),
        }
    }
}

/// Name and namespace of the record a subject is derived from.
///
/// Stands in for a zero-field placeholder record when the real schema is not
/// known yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordIdentity {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

impl RecordIdentity {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Identity of a named Avro type; `None` for anything else.
    pub fn of_schema(schema: &Schema) -> Option<Self> {
        let name: &Name = match schema {
            Schema::Record(RecordSchema { name, .. })
            | Schema::Enum(EnumSchema { name, .. })
            | Schema::Fixed(FixedSchema { name, .. }) => name,
            _ => return None,
        };
        Some(Self::new(
            name.name.clone(),
            name.namespace.clone().unwrap_or_default(),
        ))
    }

    pub fn fullname(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// Derive the subject for `topic`.
///
/// For the record-based strategies the identity comes from `schema` when it
/// is a named type, otherwise from `record_name`/`record_namespace`. Only the
/// identity is checked, never the schema's fields.
pub fn resolve_subject(
    topic: Option<&str>,
    is_key: bool,
    schema: Option<&Schema>,
    record_name: Option<&str>,
    record_namespace: Option<&str>,
    strategy: SubjectNameStrategy,
) -> Result<String> {
    let topic_required = || {
        topic
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RegistryError::SubjectResolution(format!("{} requires a topic", strategy)))
    };
    let identity = || {
        schema
            .and_then(RecordIdentity::of_schema)
            .or_else(|| {
                record_name
                    .filter(|n| !n.is_empty())
                    .map(|n| RecordIdentity::new(n, record_namespace.unwrap_or_default()))
            })
            .ok_or_else(|| {
                RegistryError::SubjectResolution(format!(
                    "{} requires a record name and namespace",
                    strategy
                ))
            })
    };

    let subject = match strategy {
        SubjectNameStrategy::TopicName => {
            let suffix = if is_key { "key" } else { "value" };
            format!("{}-{}", topic_required()?, suffix)
        }
        SubjectNameStrategy::RecordName => identity()?.fullname(),
        SubjectNameStrategy::TopicRecordName => {
            format!("{}-{}", topic_required()?, identity()?.fullname())
        }
    };
    tracing::trace!(%strategy, %subject, "Resolved subject");
    Ok(subject)
}

/// Per-direction naming settings read from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectNaming {
    pub direction: Direction,
    pub strategy: SubjectNameStrategy,
    pub topic: Option<String>,
    pub record: Option<RecordIdentity>,
}

impl SubjectNaming {
    /// Read the strategy, topic and record identity for `direction`.
    pub fn from_config(config: &RegistryConfig, direction: Direction) -> Result<Self> {
        let raw = config
            .get(&keys::naming_strategy(direction))
            .ok_or_else(|| RegistryError::configuration("naming strategy not specified", direction))?;
        let strategy = raw
            .parse::<SubjectNameStrategy>()
            .map_err(|e| RegistryError::configuration(e, direction))?;

        let record = config
            .get(&keys::record_name(direction))
            .map(|name| {
                RecordIdentity::new(
                    name,
                    config.get(&keys::record_namespace(direction)).unwrap_or_default(),
                )
            });

        Ok(Self {
            direction,
            strategy,
            topic: config.get(keys::TOPIC).map(str::to_string),
            record,
        })
    }

    /// Subject for `schema`, falling back to the configured record identity.
    pub fn subject(&self, schema: Option<&Schema>) -> Result<String> {
        resolve_subject(
            self.topic.as_deref(),
            self.direction.is_key(),
            schema,
            self.record.as_ref().map(|r| r.name.as_str()),
            self.record.as_ref().map(|r| r.namespace.as_str()),
            self.strategy,
        )
    }
}
