//! Schema fingerprints
//!
//! Fingerprints cover the full schema definition, so field defaults and docs
//! count. Two schemas that differ only in JSON whitespace share a fingerprint.

use apache_avro::Schema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 checksum of a schema definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Fingerprint of an Avro schema as it serializes to JSON
    pub fn of_definition(schema: &Schema) -> serde_json::Result<Self> {
        let json = serde_json::to_string(schema)?;
        Ok(Self::from_bytes(json.as_bytes()))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatting_does_not_change_fingerprint() {
        let compact = Schema::parse_str(
            r#"{"type":"record","name":"R","fields":[{"name":"a","type":"long"}]}"#,
        )
        .unwrap();
        let spaced = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "R",
                "fields": [ {"name": "a", "type": "long"} ]
            }"#,
        )
        .unwrap();
        assert_eq!(
            Checksum::of_definition(&compact).unwrap(),
            Checksum::of_definition(&spaced).unwrap()
        );
    }

    #[test]
    fn test_defaults_change_fingerprint() {
        let one = Schema::parse_str(
            r#"{"type":"record","name":"R","fields":[{"name":"n","type":"int","default":1}]}"#,
        )
        .unwrap();
        let two = Schema::parse_str(
            r#"{"type":"record","name":"R","fields":[{"name":"n","type":"int","default":2}]}"#,
        )
        .unwrap();
        // same canonical form, different definitions
        assert_eq!(one, two);
        assert_ne!(
            Checksum::of_definition(&one).unwrap(),
            Checksum::of_definition(&two).unwrap()
        );
    }

    #[test]
    fn test_different_schemas_differ() {
        let a = Schema::parse_str(r#""long""#).unwrap();
        let b = Schema::parse_str(r#""int""#).unwrap();
        let fingerprint = Checksum::of_definition(&a).unwrap();
        assert_ne!(fingerprint, Checksum::of_definition(&b).unwrap());
        assert_eq!(fingerprint.as_str().len(), 64);
    }
}
