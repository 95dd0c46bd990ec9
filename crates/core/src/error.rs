//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic failures (validation, malformed records,
/// disallowed status values). Transport concerns belong to the client crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. empty or missing).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A status label is not part of the resource's allowed set.
    #[error("status '{status}' is not allowed for this resource")]
    InvalidStatus { status: String },

    /// A requested entity was not found.
    #[error("not found")]
    NotFound,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_status(status: impl Into<String>) -> Self {
        Self::InvalidStatus {
            status: status.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
