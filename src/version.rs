//! Registry version and id selectors

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::LATEST;

/// A subject version as addressed in the registry API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionRef {
    Latest,
    Number(i32),
}

impl fmt::Display for VersionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRef::Latest => f.write_str(LATEST),
            VersionRef::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Which schema a configured token points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaSelector {
    /// Id of the subject's latest version
    Latest,
    /// Registry-wide schema id
    Id(i32),
    /// Version within the subject
    Version(i32),
}

impl SchemaSelector {
    /// Parse a schema-id token: `latest` or an integer id
    pub fn parse_id(token: &str) -> Result<Self, String> {
        match token.parse::<TokenValue>()? {
            TokenValue::Latest => Ok(SchemaSelector::Latest),
            TokenValue::Number(n) => Ok(SchemaSelector::Id(n)),
        }
    }

    /// Parse a version token: `latest` or an integer version
    pub fn parse_version(token: &str) -> Result<Self, String> {
        match token.parse::<TokenValue>()? {
            TokenValue::Latest => Ok(SchemaSelector::Latest),
            TokenValue::Number(n) => Ok(SchemaSelector::Version(n)),
        }
    }
}

impl fmt::Display for SchemaSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaSelector::Latest => f.write_str(LATEST),
            SchemaSelector::Id(id) => write!(f, "id {}", id),
            SchemaSelector::Version(v) => write!(f, "version {}", v),
        }
    }
}

enum TokenValue {
    Latest,
    Number(i32),
}

impl FromStr for TokenValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(LATEST) {
            return Ok(TokenValue::Latest);
        }
        s.parse::<i32>()
            .map(TokenValue::Number)
            .map_err(|_| format!("'{}' is neither '{}' nor an integer", s, LATEST))
    }
}
