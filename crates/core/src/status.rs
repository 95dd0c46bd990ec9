//! Per-resource status policies.
//!
//! Each admin resource has a finite set of lifecycle labels. Backends disagree
//! on spelling and defaults (`"new"` vs `"Pending"`, missing fields, mixed
//! case), so the policy is configured per resource instead of being global.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Allowed status labels for one resource, plus normalization rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPolicy {
    allowed: Vec<String>,
    default_status: String,
    case_sensitive: bool,
    aliases: BTreeMap<String, String>,
}

/// Outcome of normalizing a raw status value read from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedStatus {
    pub status: String,
    /// `false` when the raw value is not in the allowed set (it is kept verbatim).
    pub recognized: bool,
}

impl StatusPolicy {
    /// Build a case-sensitive policy. The first allowed label is the default.
    ///
    /// An empty set falls back to `"Pending"` as the default.
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: Vec<String> = allowed.into_iter().map(Into::into).collect();
        let default_status = allowed
            .first()
            .cloned()
            .unwrap_or_else(|| "Pending".to_string());
        Self {
            allowed,
            default_status,
            case_sensitive: true,
            aliases: BTreeMap::new(),
        }
    }

    /// Status assigned to records that arrive without one.
    pub fn with_default(mut self, status: impl Into<String>) -> Self {
        self.default_status = status.into();
        self
    }

    /// Map a backend spelling onto an allowed label (e.g. `new` -> `Pending`).
    pub fn with_alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        let key = if self.case_sensitive {
            from
        } else {
            from.to_lowercase()
        };
        self.aliases.insert(key, to.into());
        self
    }

    /// Compare labels ignoring ASCII/Unicode case.
    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self.aliases = std::mem::take(&mut self.aliases)
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        self
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    pub fn default_status(&self) -> &str {
        &self.default_status
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn eq(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.to_lowercase() == b.to_lowercase()
        }
    }

    /// Resolve aliases and casing to the allowed spelling.
    ///
    /// Returns `None` if the value is not (and does not alias to) an allowed label.
    pub fn canonical(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        let key = if self.case_sensitive {
            raw.to_string()
        } else {
            raw.to_lowercase()
        };
        let target = self.aliases.get(&key).map(String::as_str).unwrap_or(raw);
        self.allowed.iter().find(|s| self.eq(s, target)).cloned()
    }

    pub fn is_allowed(&self, status: &str) -> bool {
        self.canonical(status).is_some()
    }

    /// Whether two labels denote the same status under this policy.
    pub fn same(&self, a: &str, b: &str) -> bool {
        match (self.canonical(a), self.canonical(b)) {
            (Some(x), Some(y)) => x == y,
            _ => self.eq(a.trim(), b.trim()),
        }
    }

    /// Normalize a status read from the backend.
    pub fn normalize(&self, raw: Option<&str>) -> NormalizedStatus {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => NormalizedStatus {
                status: self.default_status.clone(),
                recognized: true,
            },
            Some(raw) => match self.canonical(raw) {
                Some(status) => NormalizedStatus {
                    status,
                    recognized: true,
                },
                None => NormalizedStatus {
                    status: raw.to_string(),
                    recognized: false,
                },
            },
        }
    }

    /// Validate a requested transition target, returning its canonical spelling.
    pub fn validate_target(&self, target: &str) -> DomainResult<String> {
        if target.trim().is_empty() {
            return Err(DomainError::validation("target status cannot be empty"));
        }
        self.canonical(target)
            .ok_or_else(|| DomainError::invalid_status(target.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan_policy() -> StatusPolicy {
        StatusPolicy::new(["Pending", "Under Review", "Approved", "Rejected", "Disbursed"])
    }

    #[test]
    fn missing_status_defaults_to_first_allowed_label() {
        let policy = loan_policy();
        let n = policy.normalize(None);
        assert_eq!(n.status, "Pending");
        assert!(n.recognized);

        let n = policy.normalize(Some("   "));
        assert_eq!(n.status, "Pending");
    }

    #[test]
    fn explicit_default_overrides_first_label() {
        let policy = loan_policy().with_default("Under Review");
        assert_eq!(policy.normalize(None).status, "Under Review");
    }

    #[test]
    fn case_sensitive_policy_keeps_unknown_spelling() {
        let policy = loan_policy();
        let n = policy.normalize(Some("approved"));
        assert_eq!(n.status, "approved");
        assert!(!n.recognized);
        assert!(!policy.is_allowed("approved"));
    }

    #[test]
    fn case_insensitive_policy_canonicalizes() {
        let policy = loan_policy().case_insensitive();
        assert_eq!(policy.canonical("approved").as_deref(), Some("Approved"));
        assert!(policy.same("REJECTED", "Rejected"));
    }

    #[test]
    fn aliases_map_backend_spellings() {
        let policy = StatusPolicy::new(["pending", "in_progress", "resolved", "closed"])
            .with_alias("new", "pending")
            .case_insensitive();
        assert_eq!(policy.normalize(Some("NEW")).status, "pending");
        assert_eq!(policy.canonical("Resolved").as_deref(), Some("resolved"));
    }

    #[test]
    fn validate_target_rejects_unknown_and_empty() {
        let policy = loan_policy();
        assert_eq!(policy.validate_target("Approved").unwrap(), "Approved");
        assert_eq!(
            policy.validate_target("Cancelled").unwrap_err(),
            DomainError::invalid_status("Cancelled")
        );
        assert!(matches!(
            policy.validate_target(" "),
            Err(DomainError::Validation(_))
        ));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 128,
                ..ProptestConfig::default()
            })]

            /// Property: normalizing an already-normalized status is a no-op.
            #[test]
            fn normalize_is_idempotent(raw in proptest::option::of("[ a-zA-Z_]{0,12}")) {
                let policy = loan_policy().with_alias("new", "Pending").case_insensitive();
                let once = policy.normalize(raw.as_deref());
                let twice = policy.normalize(Some(once.status.as_str()));
                prop_assert_eq!(&once.status, &twice.status);
                prop_assert_eq!(once.recognized, twice.recognized);
            }
        }
    }
}
