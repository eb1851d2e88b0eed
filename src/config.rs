//! Configuration for registry-backed encoding
//!
//! Settings are a flat map of dotted keys. They can be built in code or
//! loaded, in increasing priority, from:
//! - Config files (`registry.toml`, `.registry.toml`, `config/registry.toml`)
//! - The XDG config directory
//! - An explicitly named file
//! - Environment variables (`AVRO_REGISTRY_*`, `__` separates key segments)
//!
//! ## Example config file (registry.toml):
//! ```toml
//! [schema.registry]
//! url = "http://localhost:8081"
//! topic = "orders"
//!
//! [value.schema]
//! id = "latest"
//! naming.strategy = "topic.record.name"
//! record.name = "Order"
//! record.namespace = "com.example"
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Direction, RegistryError, Result};

/// Recognized configuration keys
pub mod keys {
    use crate::error::Direction;

    pub const REGISTRY_URL: &str = "schema.registry.url";
    pub const BASIC_AUTH_USER_INFO: &str = "schema.registry.basic.auth.user.info";
    pub const TIMEOUT_MS: &str = "schema.registry.timeout.ms";
    pub const TOPIC: &str = "schema.registry.topic";

    pub fn naming_strategy(direction: Direction) -> String {
        format!("{}.schema.naming.strategy", direction.prefix())
    }

    pub fn record_name(direction: Direction) -> String {
        format!("{}.schema.record.name", direction.prefix())
    }

    pub fn record_namespace(direction: Direction) -> String {
        format!("{}.schema.record.namespace", direction.prefix())
    }

    /// Schema id, or `latest`
    pub fn schema_id(direction: Direction) -> String {
        format!("{}.schema.id", direction.prefix())
    }

    pub fn schema_version(direction: Direction) -> String {
        format!("{}.schema.version", direction.prefix())
    }

    /// Schema file that bypasses the registry
    pub fn schema_file(direction: Direction) -> String {
        format!("{}.schema.file", direction.prefix())
    }
}

/// Sentinel selecting the latest registered version
pub const LATEST: &str = "latest";

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Flat map of configuration settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryConfig {
    settings: BTreeMap<String, String>,
}

impl RegistryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.settings.insert(key.to_string(), value.into());
    }

    /// Value for `key`; blank values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Connection settings for the registry client
    pub fn registry_options(&self) -> Result<RegistryOptions> {
        let url = self
            .get(keys::REGISTRY_URL)
            .ok_or_else(|| {
                RegistryError::configuration(
                    format!("'{}' is not set", keys::REGISTRY_URL),
                    Direction::Value,
                )
            })?
            .to_string();
        let timeout_ms = match self.get(keys::TIMEOUT_MS) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                RegistryError::configuration(
                    format!("'{}' is not a number: {}", keys::TIMEOUT_MS, raw),
                    Direction::Value,
                )
            })?,
            None => DEFAULT_TIMEOUT_MS,
        };
        Ok(RegistryOptions {
            url,
            basic_auth_user_info: self.get(keys::BASIC_AUTH_USER_INFO).map(str::to_string),
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Per-user config directory, when the platform has one
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "avro-registry-bridge", "avro-registry")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file on top of the defaults
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["registry.toml", ".registry.toml", "config/registry.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dir) = Self::config_dir() {
            let xdg_config = dir.join("registry.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(Environment::with_prefix("AVRO_REGISTRY").separator("__"));

        let tree: JsonValue = builder.build()?.try_deserialize()?;
        let mut settings = BTreeMap::new();
        flatten("", &tree, &mut settings);
        Ok(Self { settings })
    }

    /// Save configuration as TOML
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(&self.settings)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

fn flatten(prefix: &str, value: &JsonValue, out: &mut BTreeMap<String, String>) {
    let key = |k: &str| {
        if prefix.is_empty() {
            k.to_string()
        } else {
            format!("{}.{}", prefix, k)
        }
    };
    match value {
        JsonValue::Object(map) => {
            for (k, v) in map {
                flatten(&key(k), v, out);
            }
        }
        JsonValue::Null => {}
        JsonValue::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

/// Connection settings for a registry client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Base URL: `http(s)://host:port` or `mock://<scope>`
    pub url: String,
    /// `user:password` for HTTP basic auth
    pub basic_auth_user_info: Option<String>,
    pub timeout: Duration,
}

impl RegistryOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            basic_auth_user_info: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_blank_values_are_unset() {
        let config = RegistryConfig::new().with(keys::TOPIC, "  ");
        assert!(config.get(keys::TOPIC).is_none());
    }

    #[test]
    fn test_registry_options() {
        let config = RegistryConfig::new()
            .with(keys::REGISTRY_URL, "http://localhost:8081")
            .with(keys::TIMEOUT_MS, "1500")
            .with(keys::BASIC_AUTH_USER_INFO, "fred:letmein");
        let options = config.registry_options().unwrap();
        assert_eq!(options.url, "http://localhost:8081");
        assert_eq!(options.timeout, Duration::from_millis(1500));
        assert_eq!(options.basic_auth_user_info.as_deref(), Some("fred:letmein"));
    }

    #[test]
    fn test_missing_url_is_configuration_error() {
        let err = RegistryConfig::new().registry_options().unwrap_err();
        assert!(matches!(err, RegistryError::Configuration { .. }));
    }

    #[test]
    fn test_load_flattens_tables() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("job.toml");
        std::fs::write(
            &path,
            r#"
[schema.registry]
url = "mock://load-test"
timeout.ms = 500

[value.schema]
id = "latest"
naming.strategy = "topic.name"
"#,
        )
        .unwrap();

        let config = RegistryConfig::load_from(path.to_str()).unwrap();
        assert_eq!(config.get(keys::REGISTRY_URL), Some("mock://load-test"));
        assert_eq!(config.get(keys::TIMEOUT_MS), Some("500"));
        assert_eq!(config.get(&keys::schema_id(Direction::Value)), Some(LATEST));
        assert_eq!(
            config.get(&keys::naming_strategy(Direction::Value)),
            Some("topic.name")
        );
    }

    #[test]
    fn test_config_dir_is_named_for_this_crate() {
        // no home directory on some CI hosts
        if let Some(dir) = RegistryConfig::config_dir() {
            let dir = dir.to_string_lossy().to_string();
            assert!(dir.contains("avro-registry"));
            assert!(!dir.contains("familiar"));
        }
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let config = RegistryConfig::new()
            .with(keys::REGISTRY_URL, "mock://saved")
            .with(keys::TOPIC, "orders");
        config.save(path.to_str().unwrap()).unwrap();

        let reloaded = RegistryConfig::load_from(path.to_str()).unwrap();
        assert_eq!(reloaded.get(keys::REGISTRY_URL), Some("mock://saved"));
        assert_eq!(reloaded.get(keys::TOPIC), Some("orders"));
    }
}
