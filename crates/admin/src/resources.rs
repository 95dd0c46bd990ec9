//! Descriptors for the Cashper management screens.
//!
//! Each screen is data: endpoints, columns, searchable fields and the status
//! vocabulary its backend speaks. Lookup keys are kebab-case (`tax-planning`).

use cashper_core::{Entity, Record, StatusPolicy};

use crate::backend::Method;
use crate::descriptor::{CategoryField, ColumnSpec, ResourceDescriptor, SourceSpec};

pub const LOANS: &str = "loans";
pub const INSURANCE: &str = "insurance";
pub const INVESTMENTS: &str = "investments";
pub const TAX_PLANNING: &str = "tax-planning";
pub const RETAIL_SERVICES: &str = "retail-services";
pub const CORPORATE_SERVICES: &str = "corporate-services";
pub const INQUIRIES: &str = "inquiries";

const NAME_FIELDS: &[&str] = &["fullName", "name", "full_name", "personalInfo.fullName", "applicantName"];
const EMAIL_FIELDS: &[&str] = &["email", "personalInfo.email"];
const PHONE_FIELDS: &[&str] = &["phone", "mobile", "phoneNumber", "personalInfo.phone"];

pub fn names() -> Vec<&'static str> {
    vec![
        LOANS,
        INSURANCE,
        INVESTMENTS,
        TAX_PLANNING,
        RETAIL_SERVICES,
        CORPORATE_SERVICES,
        INQUIRIES,
    ]
}

/// Look up a descriptor by key; `_`, spaces and case are tolerated.
pub fn by_name(name: &str) -> Option<ResourceDescriptor<Record>> {
    let key = name.trim().to_lowercase().replace(['_', ' '], "-");
    match key.as_str() {
        LOANS => Some(loans()),
        INSURANCE => Some(insurance()),
        INVESTMENTS => Some(investments()),
        TAX_PLANNING => Some(tax_planning()),
        RETAIL_SERVICES => Some(retail_services()),
        CORPORATE_SERVICES => Some(corporate_services()),
        INQUIRIES => Some(inquiries()),
        _ => None,
    }
}

pub fn catalogue() -> Vec<ResourceDescriptor<Record>> {
    names().into_iter().filter_map(by_name).collect()
}

/// First non-empty value among several spellings of the same field.
fn first_of(header: &str, paths: &'static [&'static str]) -> ColumnSpec<Record> {
    ColumnSpec::new(header, move |r: &Record| {
        paths
            .iter()
            .find_map(|p| r.text(p).filter(|v| !v.trim().is_empty()))
            .unwrap_or_default()
    })
}

fn person_columns(
    d: ResourceDescriptor<Record>,
    type_header: &str,
    type_field: &str,
) -> ResourceDescriptor<Record> {
    d.column(ColumnSpec::id("ID"))
        .column(first_of("Name", NAME_FIELDS))
        .column(first_of("Email", EMAIL_FIELDS))
        .column(first_of("Phone", PHONE_FIELDS))
        .column(ColumnSpec::field(type_header, type_field))
        .column(ColumnSpec::status("Status"))
        .column(ColumnSpec::created_date("Date"))
}

fn person_search(extra: &[&str]) -> Vec<String> {
    NAME_FIELDS
        .iter()
        .chain(EMAIL_FIELDS)
        .chain(PHONE_FIELDS)
        .chain(extra)
        .map(|s| s.to_string())
        .collect()
}

/// Lower-case workflow vocabulary used by the service-application backends.
fn service_statuses() -> StatusPolicy {
    StatusPolicy::new(["pending", "in_progress", "approved", "completed", "rejected"])
        .case_insensitive()
        .with_alias("new", "pending")
        .with_alias("in progress", "in_progress")
}

pub fn loans() -> ResourceDescriptor<Record> {
    let d = ResourceDescriptor::new(
        "Loans",
        SourceSpec::new("loans", "/api/admin/loan-management/applications").list_key("applications"),
        "/api/admin/loan-management/applications/{id}/status",
    )
    .status_method(Method::Patch)
    .detail_endpoint("/api/admin/loan-management/applications/{id}")
    .document_endpoint("/api/loans/documents/download")
    .statuses(StatusPolicy::new([
        "Pending",
        "Under Review",
        "Approved",
        "Rejected",
        "Disbursed",
    ]))
    .searchable(person_search(&["loanType", "applicationId"]))
    .category(CategoryField::Field("loanType".to_string()))
    .server_filters();
    person_columns(d, "Loan Type", "loanType").column(ColumnSpec::field("Amount", "amount"))
}

pub fn insurance() -> ResourceDescriptor<Record> {
    let d = ResourceDescriptor::new(
        "Insurance",
        SourceSpec::new("insurance", "/api/insurance/all"),
        "/api/insurance/{id}/status",
    )
    .detail_endpoint("/api/insurance/{id}")
    .document_endpoint("/api/insurance/documents/download")
    .statuses(
        StatusPolicy::new(["Pending", "Active", "Approved", "Rejected", "Expired"])
            .with_alias("new", "Pending"),
    )
    .searchable(person_search(&["insuranceType", "policyNumber"]))
    .category(CategoryField::Field("insuranceType".to_string()));
    person_columns(d, "Insurance Type", "insuranceType")
}

/// Mutual funds and SIPs shown as one list; category is the source.
pub fn investments() -> ResourceDescriptor<Record> {
    let d = ResourceDescriptor::multi(
        "Investments",
        vec![
            SourceSpec::new("mutual_funds", "/api/mutual-funds/all")
                .status_endpoint("/api/mutual-funds/{id}/status"),
            SourceSpec::new("sip", "/api/sip/all").status_endpoint("/api/sip/{id}/status"),
        ],
        "/api/mutual-funds/{id}/status",
    )
    .statuses(
        StatusPolicy::new(["Pending", "Active", "Completed", "Cancelled"])
            .case_insensitive()
            .with_alias("new", "Pending"),
    )
    .searchable(person_search(&["fundName", "schemeName"]))
    .category(CategoryField::Source)
    .category_alias("mutual_funds", "Mutual Fund")
    .category_alias("sip", "SIP");
    d.column(ColumnSpec::id("ID"))
        .column(first_of("Name", NAME_FIELDS))
        .column(first_of("Email", EMAIL_FIELDS))
        .column(first_of("Fund", &["fundName", "schemeName"]))
        .column(ColumnSpec::field("Amount", "amount"))
        .column(ColumnSpec::source("Type"))
        .column(ColumnSpec::status("Status"))
        .column(ColumnSpec::created_date("Date"))
}

pub fn tax_planning() -> ResourceDescriptor<Record> {
    let d = ResourceDescriptor::new(
        "Tax Planning",
        SourceSpec::new("tax_planning", "/api/tax-planning/applications"),
        "/api/tax-planning/applications/{id}/status",
    )
    .status_method(Method::Patch)
    .detail_endpoint("/api/tax-planning/applications/{id}")
    .document_endpoint("/api/tax-planning/documents/download")
    .statuses(service_statuses())
    .searchable(person_search(&["serviceType", "panNumber"]))
    .category(CategoryField::Field("serviceType".to_string()))
    .server_filters();
    person_columns(d, "Service", "serviceType")
}

pub fn retail_services() -> ResourceDescriptor<Record> {
    let d = ResourceDescriptor::new(
        "Retail Services",
        SourceSpec::new("retail_services", "/api/retail-services/admin/applications")
            .list_key("applications"),
        "/api/retail-services/admin/applications/{id}/status",
    )
    .status_method(Method::Patch)
    .detail_endpoint("/api/retail-services/admin/applications/{id}")
    .document_endpoint("/api/retail-services/documents/download")
    .statuses(service_statuses())
    .searchable(person_search(&["serviceType"]))
    .category(CategoryField::Field("serviceType".to_string()))
    .server_filters();
    person_columns(d, "Service", "serviceType")
}

pub fn corporate_services() -> ResourceDescriptor<Record> {
    let d = ResourceDescriptor::new(
        "Corporate Services",
        SourceSpec::new("corporate_services", "/api/corporate-services/admin/applications")
            .list_key("applications"),
        "/api/corporate-services/admin/applications/{id}/status",
    )
    .status_method(Method::Patch)
    .detail_endpoint("/api/corporate-services/admin/applications/{id}")
    .document_endpoint("/api/corporate-services/documents/download")
    .statuses(service_statuses())
    .searchable(person_search(&["serviceType", "companyName"]))
    .category(CategoryField::Field("serviceType".to_string()));
    person_columns(d, "Service", "serviceType").column(ColumnSpec::field("Company", "companyName"))
}

/// Contact-form, tax consultation and service enquiries merged into one inbox.
pub fn inquiries() -> ResourceDescriptor<Record> {
    let d = ResourceDescriptor::multi(
        "Inquiries",
        vec![
            SourceSpec::new("contact", "/api/contact/admin/submissions")
                .status_endpoint("/api/contact/admin/submissions/{id}/status"),
            SourceSpec::new("personal_tax", "/api/personal-tax/admin/consultations")
                .list_key("consultations")
                .status_endpoint("/api/personal-tax/admin/consultations/{id}/status"),
            SourceSpec::new("business_tax", "/api/business-tax/admin/consultations")
                .list_key("consultations")
                .status_endpoint("/api/business-tax/admin/consultations/{id}/status"),
            SourceSpec::new("corporate", "/api/corporate-inquiry/all")
                .status_endpoint("/api/corporate-inquiry/{id}/status"),
            SourceSpec::new("retail", "/api/retail-inquiry/all")
                .status_endpoint("/api/retail-inquiry/{id}/status"),
        ],
        "/api/contact/admin/submissions/{id}/status",
    )
    .status_method(Method::Patch)
    .statuses(
        StatusPolicy::new(["pending", "in_progress", "resolved", "closed"])
            .case_insensitive()
            .with_alias("new", "pending")
            .with_alias("in progress", "in_progress"),
    )
    .searchable(person_search(&["subject", "message"]))
    .category(CategoryField::Source)
    .category_alias("contact", "Contact")
    .category_alias("personal_tax", "Personal Tax")
    .category_alias("business_tax", "Business Tax")
    .category_alias("corporate", "Corporate")
    .category_alias("retail", "Retail");
    d.column(ColumnSpec::id("ID"))
        .column(first_of("Name", NAME_FIELDS))
        .column(first_of("Email", EMAIL_FIELDS))
        .column(first_of("Phone", PHONE_FIELDS))
        .column(ColumnSpec::source("Source"))
        .column(ColumnSpec::field("Subject", "subject"))
        .column(ColumnSpec::status("Status"))
        .column(ColumnSpec::created_date("Date"))
}
