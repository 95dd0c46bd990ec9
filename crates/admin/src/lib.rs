//! `cashper-admin`
//!
//! **Responsibility:** the Admin Resource Browser for the Cashper console.
//!
//! This crate provides:
//! - A `Backend` seam with a reqwest implementation (bearer auth via `Session`)
//! - `RemoteCollectionStore` with multi-source merge and a request-generation guard
//! - Client-side filtering, pagination and detail selection
//! - The status transition workflow (the single mutation path per resource)
//! - CSV export, document downloads, report generation and profile loading
//! - Declarative descriptors for every Cashper management screen
//!
//! Every screen is an `AdminResourceBrowser<T>` configured by a `ResourceDescriptor<T>`.

pub mod backend;
pub mod browser;
pub mod config;
pub mod credentials;
pub mod descriptor;
pub mod detail;
pub mod documents;
pub mod error;
pub mod export;
pub mod filter;
pub mod notify;
pub mod paginate;
pub mod profile;
pub mod reports;
pub mod resources;
pub mod store;
pub mod workflow;

pub use backend::{Backend, HttpBackend, Method};
pub use browser::{AdminResourceBrowser, PageView};
pub use config::AdminConfig;
pub use credentials::FileTokenStore;
pub use descriptor::{CategoryField, ColumnSpec, ResourceDescriptor, SourceSpec};
pub use detail::DetailSelection;
pub use documents::DocumentDownload;
pub use error::ClientError;
pub use export::ExportFile;
pub use filter::{FilterPredicate, FilterState};
pub use notify::{Notification, NotificationLevel, NotificationLog, Notifier};
pub use paginate::{Page, PageState};
pub use profile::load_profile;
pub use reports::{ReportRequest, ReportResponse, generate_report};
pub use store::{FetchOutcome, FetchParams, FetchReport, RemoteCollectionStore};
pub use workflow::{StatusAction, StatusCommand, StatusTransitionWorkflow, TransitionOutcome, WorkflowPhase};
