//! Entity abstraction shared by every admin resource.
//!
//! Loan applications, insurance policies, investments, tax applications,
//! service applications and inquiries all share a common shape: an identifier,
//! a lifecycle status, an immutable creation timestamp, display/contact fields
//! and an optional documents map. Everything else varies per resource and is
//! reached through named (optionally dotted) field paths.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{DomainError, DomainResult};
use crate::id::EntityId;

/// One record instance of an admin resource.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Identifier, unique within the owning collection.
    fn id(&self) -> &EntityId;

    /// Current lifecycle status, if the record carries one.
    fn status(&self) -> Option<&str>;

    /// Replace the lifecycle status. Must not touch any other attribute.
    fn set_status(&mut self, status: &str);

    /// Creation timestamp (immutable once set).
    fn created_at(&self) -> Option<DateTime<Utc>>;

    /// Text rendering of a named field, `None` when missing or null.
    fn text(&self, field: &str) -> Option<String>;

    /// Document key -> storage path.
    fn documents(&self) -> BTreeMap<String, String>;

    /// Name of the backend source the record was fetched from (multi-source resources).
    fn source(&self) -> Option<&str>;

    fn tag_source(&mut self, source: &str);

    /// Fold a fuller copy of the same record (detail enrichment) into this one.
    fn absorb(&mut self, fuller: Self) {
        *self = fuller;
    }
}

const ID_KEYS: &[&str] = &["id", "_id", "application_id", "applicationId"];
const CREATED_KEYS: &[&str] = &["createdAt", "created_at", "submittedAt", "submitted_at"];

/// JSON-backed entity used by every Cashper resource descriptor.
///
/// The original field map is kept intact so that detail views and exports can
/// reach any attribute the backend sends.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: EntityId,
    created_at: Option<DateTime<Utc>>,
    source: Option<String>,
    fields: Map<String, Value>,
}

impl Record {
    /// Build a record from a JSON object.
    pub fn from_map(fields: Map<String, Value>) -> DomainResult<Self> {
        let id = ID_KEYS
            .iter()
            .find_map(|k| fields.get(*k).and_then(EntityId::from_json))
            .ok_or_else(|| DomainError::invalid_id("record has no usable id field"))?;

        let created_at = CREATED_KEYS
            .iter()
            .find_map(|k| fields.get(*k).and_then(Value::as_str).and_then(parse_timestamp));

        Ok(Self {
            id,
            created_at,
            source: None,
            fields,
        })
    }

    pub fn from_value(value: Value) -> DomainResult<Self> {
        match value {
            Value::Object(map) => Self::from_map(map),
            other => Err(DomainError::validation(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Raw field lookup supporting dotted paths (`personalInfo.fullName`).
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.fields.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Overlay fields from a fuller copy of the same record (detail enrichment).
    ///
    /// Identity and creation time are never taken from the overlay.
    pub fn merge_from(&mut self, fuller: &Record) {
        for (k, v) in &fuller.fields {
            if ID_KEYS.contains(&k.as_str()) || CREATED_KEYS.contains(&k.as_str()) {
                continue;
            }
            self.fields.insert(k.clone(), v.clone());
        }
    }
}

impl Entity for Record {
    fn id(&self) -> &EntityId {
        &self.id
    }

    fn status(&self) -> Option<&str> {
        self.fields.get("status").and_then(Value::as_str)
    }

    fn set_status(&mut self, status: &str) {
        self.fields
            .insert("status".to_string(), Value::String(status.to_string()));
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn text(&self, field: &str) -> Option<String> {
        self.get(field).and_then(value_text)
    }

    fn documents(&self) -> BTreeMap<String, String> {
        self.fields
            .get("documents")
            .and_then(Value::as_object)
            .map(|docs| {
                docs.iter()
                    .filter_map(|(k, v)| {
                        v.as_str()
                            .filter(|p| !p.is_empty())
                            .map(|p| (k.clone(), p.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn tag_source(&mut self, source: &str) {
        self.source = Some(source.to_string());
    }

    fn absorb(&mut self, fuller: Self) {
        self.merge_from(&fuller);
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Record::from_map(map).map_err(de::Error::custom)
    }
}

/// Render a scalar JSON value as display text.
///
/// Arrays of scalars are joined with `", "`; objects and nulls render as nothing.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_text).collect();
            Some(parts.join(", "))
        }
        Value::Object(_) => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
