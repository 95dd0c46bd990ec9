//! `AdminResourceBrowser`: one management screen's worth of state.
//!
//! The browser owns a store, filter and page state, the detail selection and
//! the status workflow for a single resource, all configured from one
//! [`ResourceDescriptor`]. Presentation layers (the CLI here) read views from
//! it and forward user intents to it.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use serde_json::Value;

use cashper_core::{DomainError, Entity, EntityId};

use crate::backend::Backend;
use crate::config::AdminConfig;
use crate::descriptor::ResourceDescriptor;
use crate::detail::DetailSelection;
use crate::documents::{self, DocumentDownload};
use crate::error::ClientError;
use crate::export::{self, ExportFile};
use crate::filter::{ALL, FilterPredicate, FilterState};
use crate::notify::{Notification, Notifier};
use crate::paginate::{self, PageState};
use crate::store::{self, FetchOutcome, FetchParams, FetchReport, RemoteCollectionStore};
use crate::workflow::{StatusAction, StatusTransitionWorkflow, TransitionOutcome};

/// Everything a table render needs, detached from the browser's locks.
#[derive(Debug, Clone)]
pub struct PageView<T> {
    pub items: Vec<T>,
    pub page_index: usize,
    pub total_pages: usize,
    /// Size of the filtered list.
    pub total_items: usize,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct AdminResourceBrowser<T: Entity> {
    descriptor: Arc<ResourceDescriptor<T>>,
    backend: Arc<dyn Backend>,
    notifier: Arc<dyn Notifier>,
    store: Arc<RemoteCollectionStore<T>>,
    predicate: FilterPredicate,
    filter: FilterState,
    page: PageState,
    detail: Arc<Mutex<DetailSelection<T>>>,
    workflow: StatusTransitionWorkflow<T>,
}

impl<T: Entity> AdminResourceBrowser<T> {
    pub fn new(
        descriptor: ResourceDescriptor<T>,
        backend: Arc<dyn Backend>,
        notifier: Arc<dyn Notifier>,
        config: &AdminConfig,
    ) -> Result<Self, ClientError> {
        descriptor.validate()?;
        let descriptor = Arc::new(descriptor);
        let store = Arc::new(RemoteCollectionStore::new(
            backend.clone(),
            descriptor.sources.clone(),
            descriptor.status_policy.clone(),
        ));
        let detail = Arc::new(Mutex::new(DetailSelection::new()));
        let workflow = StatusTransitionWorkflow::new(
            backend.clone(),
            store.clone(),
            detail.clone(),
            notifier.clone(),
            descriptor.clone(),
            config.close_delay,
        );
        Ok(Self {
            predicate: FilterPredicate::from_descriptor(&descriptor),
            filter: FilterState::default(),
            page: PageState::new(config.page_size),
            descriptor,
            backend,
            notifier,
            store,
            detail,
            workflow,
        })
    }

    pub fn descriptor(&self) -> &ResourceDescriptor<T> {
        &self.descriptor
    }

    pub fn store(&self) -> &RemoteCollectionStore<T> {
        &self.store
    }

    pub fn filter_state(&self) -> &FilterState {
        &self.filter
    }

    pub fn page_state(&self) -> PageState {
        self.page
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    fn detail_lock(&self) -> MutexGuard<'_, DetailSelection<T>> {
        self.detail.lock().unwrap_or_else(|p| p.into_inner())
    }

    // ----------------------------------------------------------------------
    // Loading
    // ----------------------------------------------------------------------

    /// Initial load when the screen is shown.
    pub async fn mount(&self) -> FetchReport {
        tracing::info!(resource = %self.descriptor.name, "mounting resource browser");
        self.load().await
    }

    /// Fetch with parameters derived from the current filters.
    pub async fn load(&self) -> FetchReport {
        let report = self.store.fetch(self.fetch_params()).await;
        self.report_fetch(&report);
        report
    }

    /// Re-run the last fetch (the explicit "Refresh" action).
    pub async fn refresh(&self) -> FetchReport {
        let report = self.store.refresh().await;
        self.report_fetch(&report);
        report
    }

    /// Server-side query parameters. Only descriptors with server filters send any.
    pub fn fetch_params(&self) -> FetchParams {
        if !self.descriptor.server_filters {
            return FetchParams::default();
        }
        FetchParams {
            status: self.filter.status().map(str::to_string),
            category: self.filter.category().map(str::to_string),
            ..FetchParams::default()
        }
    }

    fn report_fetch(&self, report: &FetchReport) {
        match &report.outcome {
            FetchOutcome::Failed { error } => self.notifier.notify(Notification::error(format!(
                "Failed to load {}: {error}",
                self.descriptor.name
            ))),
            FetchOutcome::Applied { .. } if !report.failed_sources.is_empty() => {
                let names: Vec<&str> = report
                    .failed_sources
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect();
                self.notifier.notify(Notification::error(format!(
                    "Some {} sources could not be loaded: {}",
                    self.descriptor.name,
                    names.join(", ")
                )));
            }
            _ => {}
        }
    }

    // ----------------------------------------------------------------------
    // Filters and paging
    // ----------------------------------------------------------------------

    /// Every filter change returns to page 1. With server-side filters the
    /// caller follows a status/category change with [`Self::load`].
    pub fn set_search(&mut self, text: impl Into<String>) {
        self.filter.search_text = text.into();
        self.page.reset();
    }

    pub fn set_status_filter(&mut self, status: impl Into<String>) {
        self.filter.status_filter = status.into();
        self.page.reset();
    }

    pub fn set_category_filter(&mut self, category: impl Into<String>) {
        self.filter.category_filter = category.into();
        self.page.reset();
    }

    /// Values offered by the status filter (`"all"` first).
    pub fn status_options(&self) -> Vec<String> {
        std::iter::once(ALL.to_string())
            .chain(self.descriptor.status_policy.allowed().iter().cloned())
            .collect()
    }

    /// Jump to a page, clamped into range for the current filtered list.
    pub fn set_page(&mut self, page_index: usize) {
        let total = paginate::total_pages(self.filtered_len(), self.page.page_size());
        self.page.go_to(page_index, total);
    }

    pub fn filtered(&self) -> Vec<T> {
        self.store
            .with_items(|items| self.predicate.apply(items, &self.filter))
    }

    fn filtered_len(&self) -> usize {
        self.store.with_items(|items| {
            items
                .iter()
                .filter(|e| self.predicate.matches(*e, &self.filter))
                .count()
        })
    }

    /// The current page. Clamps the page index if the filtered list shrank.
    pub fn view(&mut self) -> PageView<T> {
        let filtered = self.filtered();
        let total = paginate::total_pages(filtered.len(), self.page.page_size());
        self.page.clamp(total);
        let page = paginate::paginate(&filtered, &self.page);
        PageView {
            items: page.items.to_vec(),
            page_index: page.page_index,
            total_pages: page.total_pages,
            total_items: page.total_items,
            loading: self.store.is_loading(),
            error: self.store.error(),
        }
    }

    // ----------------------------------------------------------------------
    // Detail
    // ----------------------------------------------------------------------

    fn find(&self, id: &EntityId) -> Result<T, ClientError> {
        if let Some(open) = self.detail_lock().selected().filter(|e| e.id() == id) {
            return Ok(open.clone());
        }
        self.store
            .get(id)
            .ok_or_else(|| DomainError::not_found().into())
    }

    /// Open the detail overlay for `id`, enriching it from the detail
    /// endpoint when the resource has one. Enrichment failure still opens
    /// the summary record.
    pub async fn open_detail(&self, id: &EntityId) -> Result<T, ClientError> {
        let summary = self
            .store
            .get(id)
            .ok_or(ClientError::Domain(DomainError::NotFound))?;

        let entity = match self.descriptor.detail_path(id) {
            None => summary,
            Some(path) => match self.enrich(&summary, &path).await {
                Ok(full) => full,
                Err(err) => {
                    tracing::warn!(%id, %path, "detail enrichment failed; showing summary: {err}");
                    summary
                }
            },
        };

        self.detail_lock().open(entity.clone());
        Ok(entity)
    }

    async fn enrich(&self, summary: &T, path: &str) -> Result<T, ClientError> {
        let body = self.backend.get_json(path, &[]).await?;
        let body = match body {
            Value::Object(mut obj) if matches!(obj.get("data"), Some(Value::Object(_))) => {
                obj.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };
        let full: T = serde_json::from_value(body).map_err(|e| ClientError::Parse(e.to_string()))?;
        if full.id() != summary.id() {
            return Err(ClientError::Parse(format!(
                "detail endpoint returned id {} for {}",
                full.id(),
                summary.id()
            )));
        }
        let mut merged = summary.clone();
        merged.absorb(full);
        if let Some(source) = summary.source() {
            merged.tag_source(source);
        }
        store::normalize_status(&self.descriptor.status_policy, &mut merged);
        Ok(merged)
    }

    pub fn close_detail(&self) {
        self.detail_lock().close();
    }

    pub fn detail(&self) -> Option<T> {
        let detail = self.detail_lock();
        if detail.is_visible() {
            detail.selected().cloned()
        } else {
            None
        }
    }

    pub fn is_detail_open(&self) -> bool {
        self.detail_lock().is_visible()
    }

    // ----------------------------------------------------------------------
    // Mutations and output
    // ----------------------------------------------------------------------

    pub fn actions(&self, entity: &T) -> Vec<StatusAction> {
        self.workflow.actions(entity)
    }

    pub fn workflow(&self) -> &StatusTransitionWorkflow<T> {
        &self.workflow
    }

    /// Route a status change for `id` through the workflow.
    pub async fn change_status(
        &self,
        id: &EntityId,
        target: &str,
    ) -> Result<TransitionOutcome<T>, ClientError> {
        let entity = self.find(id)?;
        Ok(self.workflow.transition(&entity, target).await)
    }

    /// CSV of the currently filtered list (not the whole collection).
    pub fn export_csv(&self, date: NaiveDate) -> ExportFile {
        let items = self.filtered();
        let file = export::csv_export(&self.descriptor.name, &items, &self.descriptor.columns, date);
        tracing::info!(
            resource = %self.descriptor.name,
            rows = items.len(),
            file = %file.filename,
            "export prepared"
        );
        self.notifier.notify(Notification::info(format!(
            "Exported {} {} records to {}",
            items.len(),
            self.descriptor.name,
            file.filename
        )));
        file
    }

    /// Download the document stored under `key` in the entity's documents map.
    pub async fn download_document(
        &self,
        id: &EntityId,
        key: &str,
    ) -> Result<DocumentDownload, ClientError> {
        let Some(prefix) = self.descriptor.document_endpoint.as_deref() else {
            return Err(DomainError::validation(format!(
                "{} has no document downloads",
                self.descriptor.name
            ))
            .into());
        };
        let entity = self.find(id)?;
        let docs = entity.documents();
        let stored = docs.get(key).ok_or_else(|| {
            DomainError::validation(format!("{id} has no document '{key}'"))
        })?;
        match documents::download(&*self.backend, prefix, id, stored).await {
            Ok(doc) => Ok(doc),
            Err(err) => {
                self.notifier.notify(Notification::error(format!(
                    "Failed to download {key}: {}",
                    err.user_message()
                )));
                Err(err)
            }
        }
    }
}
