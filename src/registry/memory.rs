//! Process-local in-memory registry
//!
//! Backs `mock://<scope>` URLs. Every scope name maps to one shared registry
//! for the lifetime of the process, so clients configured with the same URL
//! see each other's registrations.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use apache_avro::Schema;
use parking_lot::{Mutex, RwLock};

use super::transport::{RegistryEntry, RegistryTransport, TransportError, TransportResult};
use crate::checksum::Checksum;
use crate::compatibility::CompatibilityChecker;
use crate::version::VersionRef;

/// URL scheme selecting the in-memory registry
pub const MOCK_SCHEME: &str = "mock://";

static SCOPES: OnceLock<Mutex<HashMap<String, Arc<MemoryTransport>>>> = OnceLock::new();

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i32,
    schemas: HashMap<i32, Schema>,
    ids_by_checksum: HashMap<Checksum, i32>,
    /// ids per subject, index + 1 is the version
    subjects: HashMap<String, Vec<i32>>,
}

/// In-memory schema registry
#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: RwLock<MemoryState>,
}

impl MemoryTransport {
    /// A fresh registry not shared with any scope
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared registry for `scope`, created on first use
    pub fn scope(scope: &str) -> Arc<MemoryTransport> {
        let scopes = SCOPES.get_or_init(|| Mutex::new(HashMap::new()));
        scopes
            .lock()
            .entry(scope.to_string())
            .or_insert_with(|| Arc::new(MemoryTransport::new()))
            .clone()
    }

    /// Forget every registration in `scope`
    pub fn drop_scope(scope: &str) {
        if let Some(scopes) = SCOPES.get() {
            scopes.lock().remove(scope);
        }
    }

    fn entry(state: &MemoryState, subject: &str, version: i32) -> Option<RegistryEntry> {
        let ids = state.subjects.get(subject)?;
        let id = *ids.get(usize::try_from(version - 1).ok()?)?;
        let schema = state.schemas.get(&id)?.clone();
        Some(RegistryEntry {
            subject: subject.to_string(),
            id,
            version,
            schema,
        })
    }

    fn latest(state: &MemoryState, subject: &str) -> Option<RegistryEntry> {
        let count = state.subjects.get(subject)?.len();
        Self::entry(state, subject, count as i32)
    }
}

impl RegistryTransport for MemoryTransport {
    fn register(&self, subject: &str, schema: &Schema) -> TransportResult<i32> {
        let checksum = Checksum::of_definition(schema).map_err(|e| TransportError::Rejected {
            status: 422,
            code: 42201,
            message: format!("schema cannot be serialized: {}", e),
        })?;
        let mut state = self.state.write();

        if let Some(&id) = state.ids_by_checksum.get(&checksum) {
            if state
                .subjects
                .get(subject)
                .is_some_and(|ids| ids.contains(&id))
            {
                return Ok(id);
            }
        }

        if let Some(latest) = Self::latest(&state, subject) {
            let result = CompatibilityChecker::new().check_backward(schema, &latest.schema);
            if !result.is_compatible {
                return Err(TransportError::Rejected {
                    status: 409,
                    code: 409,
                    message: format!(
                        "schema is incompatible with version {} of '{}': {}",
                        latest.version,
                        subject,
                        result.messages.join("; ")
                    ),
                });
            }
        }

        let id = match state.ids_by_checksum.get(&checksum) {
            Some(&id) => id,
            None => {
                state.next_id += 1;
                let id = state.next_id;
                state.schemas.insert(id, schema.clone());
                state.ids_by_checksum.insert(checksum, id);
                id
            }
        };
        state.subjects.entry(subject.to_string()).or_default().push(id);
        tracing::debug!(subject = %subject, schema_id = id, "Registered schema in memory");
        Ok(id)
    }

    fn schema_by_id(&self, id: i32, subject: Option<&str>) -> TransportResult<Schema> {
        let state = self.state.read();
        let schema = state
            .schemas
            .get(&id)
            .ok_or_else(|| TransportError::NotFound(format!("schema {}", id)))?;
        match subject {
            Some(subject) if !state.subjects.get(subject).is_some_and(|ids| ids.contains(&id)) => {
                Err(TransportError::NotFound(format!(
                    "schema {} under subject '{}'",
                    id, subject
                )))
            }
            _ => Ok(schema.clone()),
        }
    }

    fn subject_version(&self, subject: &str, version: VersionRef) -> TransportResult<RegistryEntry> {
        let state = self.state.read();
        let entry = match version {
            VersionRef::Latest => Self::latest(&state, subject),
            VersionRef::Number(n) => Self::entry(&state, subject, n),
        };
        entry.ok_or_else(|| {
            TransportError::NotFound(format!("version {} of subject '{}'", version, subject))
        })
    }

    fn versions(&self, subject: &str) -> TransportResult<Vec<i32>> {
        let state = self.state.read();
        let ids = state
            .subjects
            .get(subject)
            .ok_or_else(|| TransportError::NotFound(format!("subject '{}'", subject)))?;
        Ok((1..=ids.len() as i32).collect())
    }

    fn test_compatibility(&self, subject: &str, schema: &Schema) -> TransportResult<bool> {
        let state = self.state.read();
        Ok(match Self::latest(&state, subject) {
            Some(latest) => {
                CompatibilityChecker::new()
                    .check_backward(schema, &latest.schema)
                    .is_compatible
            }
            None => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(extra: &str) -> Schema {
        Schema::parse_str(&format!(
            r#"{{"type": "record", "name": "Order", "namespace": "com.example", "fields": [
                {{"name": "id", "type": "long"}}{}
            ]}}"#,
            extra
        ))
        .unwrap()
    }

    #[test]
    fn test_ids_and_versions() {
        let registry = MemoryTransport::new();
        let v1 = record("");
        let v2 = record(r#", {"name": "note", "type": ["null", "string"], "default": null}"#);

        let id1 = registry.register("orders-value", &v1).unwrap();
        let id2 = registry.register("orders-value", &v2).unwrap();
        assert_eq!((id1, id2), (1, 2));
        assert_eq!(registry.versions("orders-value").unwrap(), vec![1, 2]);

        let latest = registry
            .subject_version("orders-value", VersionRef::Latest)
            .unwrap();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.id, id2);
    }

    #[test]
    fn test_identical_schema_reuses_id() {
        let registry = MemoryTransport::new();
        let id = registry.register("a-value", &record("")).unwrap();
        assert_eq!(registry.register("a-value", &record("")).unwrap(), id);
        // same schema under another subject keeps its global id
        assert_eq!(registry.register("b-value", &record("")).unwrap(), id);
        assert_eq!(registry.versions("a-value").unwrap(), vec![1]);
    }

    #[test]
    fn test_changed_default_gets_new_id() {
        let registry = MemoryTransport::new();
        let with_default = |n: i32| {
            Schema::parse_str(&format!(
                r#"{{"type": "record", "name": "Counter", "fields": [
                    {{"name": "n", "type": "int", "default": {}}}
                ]}}"#,
                n
            ))
            .unwrap()
        };

        assert_eq!(registry.register("counters-value", &with_default(1)).unwrap(), 1);
        assert_eq!(registry.register("counters-value", &with_default(2)).unwrap(), 2);
        assert_eq!(registry.versions("counters-value").unwrap(), vec![1, 2]);

        let Schema::Record(first) = registry.schema_by_id(1, None).unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(first.fields[0].default, Some(serde_json::json!(1)));
    }

    #[test]
    fn test_incompatible_registration_rejected() {
        let registry = MemoryTransport::new();
        registry.register("orders-value", &record("")).unwrap();
        let breaking = record(r#", {"name": "total", "type": "double"}"#);

        assert!(!registry.test_compatibility("orders-value", &breaking).unwrap());
        let err = registry.register("orders-value", &breaking).unwrap_err();
        assert!(matches!(err, TransportError::Rejected { status: 409, .. }));
        assert_eq!(registry.versions("orders-value").unwrap(), vec![1]);
    }

    #[test]
    fn test_lookup_misses() {
        let registry = MemoryTransport::new();
        let id = registry.register("orders-value", &record("")).unwrap();
        assert!(registry.schema_by_id(id, Some("orders-value")).is_ok());
        assert!(registry.schema_by_id(id, Some("other-value")).unwrap_err().is_not_found());
        assert!(registry.schema_by_id(99, None).unwrap_err().is_not_found());
        assert!(registry.versions("missing").unwrap_err().is_not_found());
        assert!(registry
            .subject_version("orders-value", VersionRef::Number(0))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_scopes_are_shared() {
        let a = MemoryTransport::scope("memory-scope-shared");
        let b = MemoryTransport::scope("memory-scope-shared");
        a.register("s", &record("")).unwrap();
        assert_eq!(b.versions("s").unwrap(), vec![1]);
        MemoryTransport::drop_scope("memory-scope-shared");
    }
}
