//! Schema registry client facade
//!
//! Lookups never fail: a missing schema, an unconfigured client and a
//! transport failure all read as `None`/`false`, the last one logged first.
//! Registration and compatibility checks raise errors instead.

use std::sync::{Arc, OnceLock};

use apache_avro::Schema;
use parking_lot::RwLock;

use super::http::HttpTransport;
use super::memory::{MemoryTransport, MOCK_SCHEME};
use super::transport::{RegistryEntry, RegistryTransport, TransportError};
use crate::config::RegistryOptions;
use crate::error::{Direction, RegistryError, Result};
use crate::version::VersionRef;

static GLOBAL: OnceLock<RegistryClient> = OnceLock::new();

struct Connection {
    url: String,
    transport: Arc<dyn RegistryTransport>,
}

/// Handle to one schema registry connection
#[derive(Default)]
pub struct RegistryClient {
    connection: RwLock<Option<Connection>>,
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("url", &self.configured_url())
            .finish()
    }
}

impl RegistryClient {
    /// An unconfigured client
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide client shared by hosts that want a single connection
    pub fn global() -> &'static RegistryClient {
        GLOBAL.get_or_init(RegistryClient::new)
    }

    /// A client already connected to `transport`
    pub fn with_transport(url: impl Into<String>, transport: Arc<dyn RegistryTransport>) -> Self {
        Self {
            connection: RwLock::new(Some(Connection {
                url: url.into(),
                transport,
            })),
        }
    }

    /// Connect using `options`.
    ///
    /// Only the first call takes effect; later calls are ignored until
    /// [`reset`](Self::reset), even when the options differ.
    pub fn configure(&self, options: &RegistryOptions) -> Result<()> {
        let mut connection = self.connection.write();
        if let Some(existing) = connection.as_ref() {
            if existing.url != options.url {
                tracing::debug!(
                    configured = %existing.url,
                    requested = %options.url,
                    "Registry client already configured, ignoring new options"
                );
            }
            return Ok(());
        }

        let transport = connect(options)?;
        tracing::debug!(url = %options.url, "Configured registry client");
        *connection = Some(Connection {
            url: options.url.clone(),
            transport,
        });
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.connection.read().is_some()
    }

    /// URL of the active connection
    pub fn configured_url(&self) -> Option<String> {
        self.connection.read().as_ref().map(|c| c.url.clone())
    }

    /// Drop the connection. Calls already in flight finish on the old one.
    pub fn reset(&self) {
        if self.connection.write().take().is_some() {
            tracing::debug!("Registry client reset");
        }
    }

    fn transport(&self) -> Option<Arc<dyn RegistryTransport>> {
        self.connection.read().as_ref().map(|c| c.transport.clone())
    }

    /// Register `schema` under `subject` and return its id
    pub fn register_schema(&self, schema: &Schema, subject: &str) -> Result<i32> {
        let transport = self.transport().ok_or(RegistryError::RegistryUnavailable)?;
        match transport.register(subject, schema) {
            Ok(id) => {
                tracing::debug!(subject = %subject, schema_id = id, "Schema registered");
                Ok(id)
            }
            Err(e) => {
                tracing::error!(subject = %subject, error = %e, "Schema registration failed");
                Err(RegistryError::RegistryRejected(e.to_string()))
            }
        }
    }

    pub fn get_by_subject_and_id(&self, subject: &str, id: i32) -> Option<Schema> {
        let transport = self.transport()?;
        lookup(
            transport.schema_by_id(id, Some(subject)),
            subject,
            "schema by id",
        )
    }

    /// Schema with `id` regardless of subject
    pub fn get_by_id(&self, id: i32) -> Option<Schema> {
        let transport = self.transport()?;
        lookup(transport.schema_by_id(id, None), "", "schema by id")
    }

    pub fn get_by_subject_and_version(&self, subject: &str, version: i32) -> Option<RegistryEntry> {
        let transport = self.transport()?;
        lookup(
            transport.subject_version(subject, VersionRef::Number(version)),
            subject,
            "subject version",
        )
    }

    pub fn get_latest_entry(&self, subject: &str) -> Option<RegistryEntry> {
        let transport = self.transport()?;
        lookup(
            transport.subject_version(subject, VersionRef::Latest),
            subject,
            "latest version",
        )
    }

    /// Id of the latest version of `subject`
    pub fn get_latest_version_id(&self, subject: &str) -> Option<i32> {
        self.get_latest_entry(subject).map(|entry| entry.id)
    }

    pub fn list_versions(&self, subject: &str) -> Option<Vec<i32>> {
        let transport = self.transport()?;
        lookup(transport.versions(subject), subject, "versions")
    }

    /// Whether `schema` may be registered under `subject`.
    ///
    /// Unlike the lookups this fails when the client is not configured.
    pub fn is_compatible(&self, schema: &Schema, subject: &str) -> Result<bool> {
        let transport = self.transport().ok_or(RegistryError::RegistryUnavailable)?;
        transport.test_compatibility(subject, schema).map_err(|e| {
            tracing::error!(subject = %subject, error = %e, "Compatibility check failed");
            RegistryError::RegistryRejected(e.to_string())
        })
    }

    /// Whether `subject` has at least one version
    pub fn exists(&self, subject: &str) -> bool {
        let Some(transport) = self.transport() else {
            return false;
        };
        match transport.versions(subject) {
            Ok(versions) => !versions.is_empty(),
            Err(e) if e.is_not_found() => false,
            Err(e) => {
                tracing::error!(subject = %subject, error = %e, "Subject lookup failed");
                false
            }
        }
    }
}

fn connect(options: &RegistryOptions) -> Result<Arc<dyn RegistryTransport>> {
    let url = options.url.trim();
    if url.is_empty() {
        return Err(RegistryError::configuration(
            "registry url is empty",
            Direction::Value,
        ));
    }
    if let Some(scope) = url.strip_prefix(MOCK_SCHEME) {
        return Ok(MemoryTransport::scope(scope));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return Ok(Arc::new(HttpTransport::new(options)?));
    }
    Err(RegistryError::configuration(
        format!("unsupported registry url '{}'", url),
        Direction::Value,
    ))
}

fn lookup<T>(result: std::result::Result<T, TransportError>, subject: &str, what: &str) -> Option<T> {
    match result {
        Ok(found) => Some(found),
        Err(e) if e.is_not_found() => {
            tracing::debug!(subject = %subject, "{} not found", what);
            None
        }
        Err(e) => {
            tracing::warn!(subject = %subject, error = %e, "Registry lookup of {} failed", what);
            None
        }
    }
}
