//! Entity identifiers.
//!
//! Backends in this system are not consistent about identifier types: some
//! resources use numeric primary keys, others hand out opaque strings (Mongo
//! object ids, application numbers). `EntityId` keeps both shapes without
//! coercing one into the other.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DomainError;

/// Identifier of one entity, unique within its resource type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl EntityId {
    /// Extract an identifier from a JSON value (number or non-empty string).
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Number),
            Value::String(s) if !s.trim().is_empty() => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Percent-encoded form used as one segment of an endpoint URL.
    pub fn as_path_segment(&self) -> String {
        match self {
            EntityId::Number(n) => n.to_string(),
            EntityId::Text(s) => urlencoding::encode(s).into_owned(),
        }
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{n}"),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl FromStr for EntityId {
    type Err = DomainError;

    /// Numeric strings become `Number`, everything else `Text`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("EntityId: empty"));
        }
        match trimmed.parse::<i64>() {
            Ok(n) => Ok(Self::Number(n)),
            Err(_) => Ok(Self::Text(trimmed.to_string())),
        }
    }
}
