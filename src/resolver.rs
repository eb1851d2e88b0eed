//! Schema resolution from configuration
//!
//! Decides which schema a direction uses: a schema file when one is
//! configured, otherwise a registry schema selected by id, by version or by
//! the `latest` sentinel under the subject derived from the naming settings.
//! Nothing is retried here.

use std::fs;

use apache_avro::Schema;

use crate::config::{keys, RegistryConfig};
use crate::error::{Direction, RegistryError, Result};
use crate::naming::SubjectNaming;
use crate::registry::RegistryClient;
use crate::version::SchemaSelector;

/// Schema for record values
pub fn load_value_schema(client: &RegistryClient, config: &RegistryConfig) -> Result<Schema> {
    load_schema(client, config, Direction::Value)
}

/// Schema for record keys
pub fn load_key_schema(client: &RegistryClient, config: &RegistryConfig) -> Result<Schema> {
    load_schema(client, config, Direction::Key)
}

/// Schema for `direction`, selected by the configured id or version
pub fn load_schema(
    client: &RegistryClient,
    config: &RegistryConfig,
    direction: Direction,
) -> Result<Schema> {
    if let Some(schema) = load_schema_file(config, direction)? {
        return Ok(schema);
    }

    let subject = connect_and_resolve(client, config, direction)?;

    let selector = if let Some(token) = config.get(&keys::schema_id(direction)) {
        SchemaSelector::parse_id(token)
    } else if let Some(token) = config.get(&keys::schema_version(direction)) {
        SchemaSelector::parse_version(token)
    } else {
        return Err(RegistryError::configuration(
            format!(
                "neither '{}' nor '{}' is set",
                keys::schema_id(direction),
                keys::schema_version(direction)
            ),
            direction,
        ));
    }
    .map_err(|e| RegistryError::configuration(e, direction))?;

    fetch(client, &subject, selector)
}

/// Schema for `direction` at a given subject `version`
pub fn load_by_version(
    client: &RegistryClient,
    config: &RegistryConfig,
    direction: Direction,
    version: i32,
) -> Result<Schema> {
    if let Some(schema) = load_schema_file(config, direction)? {
        return Ok(schema);
    }
    let subject = connect_and_resolve(client, config, direction)?;
    fetch(client, &subject, SchemaSelector::Version(version))
}

/// Subject `schema` is registered under for `direction`
pub fn resolve_subject(
    config: &RegistryConfig,
    direction: Direction,
    schema: Option<&Schema>,
) -> Result<String> {
    SubjectNaming::from_config(config, direction)?.subject(schema)
}

fn load_schema_file(config: &RegistryConfig, direction: Direction) -> Result<Option<Schema>> {
    let Some(path) = config.get(&keys::schema_file(direction)) else {
        return Ok(None);
    };
    let text = fs::read_to_string(path)?;
    let schema = Schema::parse_str(&text)
        .map_err(|e| RegistryError::SchemaParse(format!("{}: {}", path, e)))?;
    tracing::debug!(%direction, path = %path, "Loaded schema from file");
    Ok(Some(schema))
}

fn connect_and_resolve(
    client: &RegistryClient,
    config: &RegistryConfig,
    direction: Direction,
) -> Result<String> {
    let options = config.registry_options().map_err(|e| match e {
        RegistryError::Configuration { message, .. } => {
            RegistryError::configuration(message, direction)
        }
        other => other,
    })?;
    client.configure(&options)?;
    resolve_subject(config, direction, None)
}

fn fetch(client: &RegistryClient, subject: &str, selector: SchemaSelector) -> Result<Schema> {
    let not_found = || RegistryError::SchemaNotFound(format!("{} of subject '{}'", selector, subject));
    let schema = match selector {
        SchemaSelector::Latest => {
            let id = client.get_latest_version_id(subject).ok_or_else(not_found)?;
            client.get_by_subject_and_id(subject, id)
        }
        SchemaSelector::Id(id) => client.get_by_subject_and_id(subject, id),
        SchemaSelector::Version(version) => client
            .get_by_subject_and_version(subject, version)
            .map(|entry| entry.schema),
    };
    let schema = schema.ok_or_else(not_found)?;
    tracing::debug!(subject = %subject, %selector, "Resolved schema from registry");
    Ok(schema)
}
