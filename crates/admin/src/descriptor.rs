//! Declarative description of one admin resource.
//!
//! A descriptor is everything that differs between management screens:
//! endpoints, the columns shown and exported, searchable fields, the
//! category field and the status policy. The browser machinery is shared.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use cashper_core::{DomainError, DomainResult, Entity, EntityId, StatusPolicy};

use crate::backend::Method;

/// Extracts the display/export value of one column.
pub type Accessor<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// One table/export column: header plus accessor.
pub struct ColumnSpec<T> {
    pub header: String,
    accessor: Accessor<T>,
}

impl<T> Clone for ColumnSpec<T> {
    fn clone(&self) -> Self {
        Self {
            header: self.header.clone(),
            accessor: Arc::clone(&self.accessor),
        }
    }
}

impl<T> fmt::Debug for ColumnSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnSpec").field("header", &self.header).finish()
    }
}

impl<T> ColumnSpec<T> {
    pub fn new<F>(header: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            header: header.into(),
            accessor: Arc::new(accessor),
        }
    }

    pub fn value(&self, entity: &T) -> String {
        (self.accessor)(entity)
    }
}

impl<T: Entity> ColumnSpec<T> {
    /// Column reading a (possibly dotted) field; missing values render empty.
    pub fn field(header: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(header, move |e: &T| e.text(&path).unwrap_or_default())
    }

    pub fn id(header: impl Into<String>) -> Self {
        Self::new(header, |e: &T| e.id().to_string())
    }

    pub fn status(header: impl Into<String>) -> Self {
        Self::new(header, |e: &T| e.status().unwrap_or_default().to_string())
    }

    /// Creation date as `YYYY-MM-DD`.
    pub fn created_date(header: impl Into<String>) -> Self {
        Self::new(header, |e: &T| {
            e.created_at()
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        })
    }

    pub fn source(header: impl Into<String>) -> Self {
        Self::new(header, |e: &T| e.source().unwrap_or_default().to_string())
    }
}

/// One backend list endpoint contributing to a resource's collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    /// Tagged onto every record fetched from this source.
    pub name: String,
    pub list_endpoint: String,
    /// Envelope key holding the list, when the backend wraps it.
    pub list_key: Option<String>,
    /// Status endpoint template overriding the resource default for records of this source.
    pub status_endpoint: Option<String>,
}

impl SourceSpec {
    pub fn new(name: impl Into<String>, list_endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            list_endpoint: list_endpoint.into(),
            list_key: None,
            status_endpoint: None,
        }
    }

    pub fn list_key(mut self, key: impl Into<String>) -> Self {
        self.list_key = Some(key.into());
        self
    }

    pub fn status_endpoint(mut self, template: impl Into<String>) -> Self {
        self.status_endpoint = Some(template.into());
        self
    }
}

/// Where the category filter reads its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryField {
    /// A named (possibly dotted) entity field.
    Field(String),
    /// The name of the source the record came from.
    Source,
}

/// Everything a management screen needs to know about its resource.
pub struct ResourceDescriptor<T> {
    pub name: String,
    pub sources: Vec<SourceSpec>,
    /// Full-record endpoint template (`{id}` placeholder) used for enrichment.
    pub detail_endpoint: Option<String>,
    pub status_endpoint: String,
    pub status_method: Method,
    /// Prefix for `<prefix>/<id>/<path>` document downloads.
    pub document_endpoint: Option<String>,
    pub columns: Vec<ColumnSpec<T>>,
    pub status_policy: StatusPolicy,
    pub searchable_fields: Vec<String>,
    pub category_field: Option<CategoryField>,
    /// Raw category value -> filter value.
    pub category_aliases: BTreeMap<String, String>,
    /// Send status/category as query parameters instead of filtering locally only.
    pub server_filters: bool,
}

impl<T> Clone for ResourceDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            sources: self.sources.clone(),
            detail_endpoint: self.detail_endpoint.clone(),
            status_endpoint: self.status_endpoint.clone(),
            status_method: self.status_method,
            document_endpoint: self.document_endpoint.clone(),
            columns: self.columns.clone(),
            status_policy: self.status_policy.clone(),
            searchable_fields: self.searchable_fields.clone(),
            category_field: self.category_field.clone(),
            category_aliases: self.category_aliases.clone(),
            server_filters: self.server_filters,
        }
    }
}

impl<T> fmt::Debug for ResourceDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("name", &self.name)
            .field("sources", &self.sources)
            .field("status_endpoint", &self.status_endpoint)
            .field("columns", &self.columns.len())
            .finish_non_exhaustive()
    }
}

impl<T: Entity> ResourceDescriptor<T> {
    /// Single-source resource.
    pub fn new(name: impl Into<String>, source: SourceSpec, status_endpoint: impl Into<String>) -> Self {
        Self::multi(name, vec![source], status_endpoint)
    }

    /// Resource merged from several list endpoints (first-listed source wins on id clashes).
    pub fn multi(
        name: impl Into<String>,
        sources: Vec<SourceSpec>,
        status_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            sources,
            detail_endpoint: None,
            status_endpoint: status_endpoint.into(),
            status_method: Method::Put,
            document_endpoint: None,
            columns: Vec::new(),
            status_policy: StatusPolicy::new(["Pending", "Approved", "Rejected"]),
            searchable_fields: Vec::new(),
            category_field: None,
            category_aliases: BTreeMap::new(),
            server_filters: false,
        }
    }

    pub fn status_method(mut self, method: Method) -> Self {
        self.status_method = method;
        self
    }

    pub fn detail_endpoint(mut self, template: impl Into<String>) -> Self {
        self.detail_endpoint = Some(template.into());
        self
    }

    pub fn document_endpoint(mut self, prefix: impl Into<String>) -> Self {
        self.document_endpoint = Some(prefix.into());
        self
    }

    pub fn column(mut self, column: ColumnSpec<T>) -> Self {
        self.columns.push(column);
        self
    }

    pub fn statuses(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    pub fn searchable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn category(mut self, field: CategoryField) -> Self {
        self.category_field = Some(field);
        self
    }

    pub fn category_alias(mut self, raw: impl Into<String>, value: impl Into<String>) -> Self {
        self.category_aliases.insert(raw.into(), value.into());
        self
    }

    pub fn server_filters(mut self) -> Self {
        self.server_filters = true;
        self
    }

    /// Check structural invariants before a browser is built on this descriptor.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("resource name cannot be empty"));
        }
        if self.sources.is_empty() {
            return Err(DomainError::validation(format!(
                "{}: at least one list source is required",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.name.as_str()) {
                return Err(DomainError::validation(format!(
                    "{}: duplicate source name '{}'",
                    self.name, source.name
                )));
            }
        }
        let templates = std::iter::once(&self.status_endpoint)
            .chain(self.sources.iter().filter_map(|s| s.status_endpoint.as_ref()))
            .chain(self.detail_endpoint.iter());
        for template in templates {
            if !template.contains("{id}") {
                return Err(DomainError::validation(format!(
                    "{}: endpoint template '{}' lacks an {{id}} placeholder",
                    self.name, template
                )));
            }
        }
        if self.status_policy.allowed().is_empty() {
            return Err(DomainError::validation(format!(
                "{}: status policy has no allowed values",
                self.name
            )));
        }
        Ok(())
    }

    /// Status endpoint for an entity, honoring per-source overrides.
    pub fn status_path(&self, entity: &T) -> String {
        let template = entity
            .source()
            .and_then(|name| self.sources.iter().find(|s| s.name == name))
            .and_then(|s| s.status_endpoint.as_deref())
            .unwrap_or(&self.status_endpoint);
        expand(template, entity.id())
    }

    pub fn detail_path(&self, id: &EntityId) -> Option<String> {
        self.detail_endpoint.as_deref().map(|t| expand(t, id))
    }

    pub fn is_multi_source(&self) -> bool {
        self.sources.len() > 1
    }
}

/// Substitute `{id}` in an endpoint template.
pub fn expand(template: &str, id: &EntityId) -> String {
    template.replace("{id}", &id.as_path_segment())
}
