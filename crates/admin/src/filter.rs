//! Client-side search / status / category filtering.

use std::collections::BTreeMap;

use cashper_core::{Entity, StatusPolicy};
use serde::{Deserialize, Serialize};

use crate::descriptor::{CategoryField, ResourceDescriptor};

/// Sentinel filter value meaning "no restriction".
pub const ALL: &str = "all";

/// User-controlled filter inputs for one screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub search_text: String,
    pub status_filter: String,
    pub category_filter: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            status_filter: ALL.to_string(),
            category_filter: ALL.to_string(),
        }
    }
}

impl FilterState {
    pub fn status(&self) -> Option<&str> {
        restriction(&self.status_filter)
    }

    pub fn category(&self) -> Option<&str> {
        restriction(&self.category_filter)
    }

    pub fn search(&self) -> Option<&str> {
        let trimmed = self.search_text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.status().is_none() && self.category().is_none() && self.search().is_none()
    }
}

fn restriction(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL) {
        None
    } else {
        Some(trimmed)
    }
}

/// Inclusion test built from a resource descriptor.
///
/// Pure: no interior state, never mutates the entity or the filter.
#[derive(Debug, Clone)]
pub struct FilterPredicate {
    searchable_fields: Vec<String>,
    category_field: Option<CategoryField>,
    category_aliases: BTreeMap<String, String>,
    status_policy: StatusPolicy,
}

impl FilterPredicate {
    pub fn new(
        searchable_fields: Vec<String>,
        category_field: Option<CategoryField>,
        status_policy: StatusPolicy,
    ) -> Self {
        Self {
            searchable_fields,
            category_field,
            category_aliases: BTreeMap::new(),
            status_policy,
        }
    }

    pub fn from_descriptor<T: Entity>(descriptor: &ResourceDescriptor<T>) -> Self {
        Self {
            searchable_fields: descriptor.searchable_fields.clone(),
            category_field: descriptor.category_field.clone(),
            category_aliases: descriptor.category_aliases.clone(),
            status_policy: descriptor.status_policy.clone(),
        }
    }

    /// All three conditions ANDed; `"all"` disables a condition.
    pub fn matches<T: Entity>(&self, entity: &T, filter: &FilterState) -> bool {
        self.matches_search(entity, filter.search())
            && self.matches_status(entity, filter.status())
            && self.matches_category(entity, filter.category())
    }

    /// Case-insensitive substring match on the id or any searchable field.
    /// Missing fields never match.
    fn matches_search<T: Entity>(&self, entity: &T, needle: Option<&str>) -> bool {
        let Some(needle) = needle else {
            return true;
        };
        let needle = needle.to_lowercase();
        if entity.id().to_string().to_lowercase().contains(&needle) {
            return true;
        }
        self.searchable_fields.iter().any(|field| {
            entity
                .text(field)
                .map(|v| v.to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
    }

    fn matches_status<T: Entity>(&self, entity: &T, wanted: Option<&str>) -> bool {
        match wanted {
            None => true,
            Some(wanted) => entity
                .status()
                .map(|s| self.status_policy.same(s, wanted))
                .unwrap_or(false),
        }
    }

    fn matches_category<T: Entity>(&self, entity: &T, wanted: Option<&str>) -> bool {
        let Some(wanted) = wanted else {
            return true;
        };
        let raw = match &self.category_field {
            None => return true,
            Some(CategoryField::Source) => entity.source().map(str::to_string),
            Some(CategoryField::Field(path)) => entity.text(path),
        };
        let Some(raw) = raw else {
            return false;
        };
        let mapped = self.category_aliases.get(&raw).cloned().unwrap_or(raw);
        mapped == wanted
    }

    /// Apply the predicate to a collection, preserving order.
    pub fn apply<T: Entity>(&self, items: &[T], filter: &FilterState) -> Vec<T> {
        items
            .iter()
            .filter(|e| self.matches(*e, filter))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cashper_core::{EntityId, Record};
    use proptest::prelude::*;
    use serde_json::json;

    fn record(v: serde_json::Value) -> Record {
        serde_json::from_value(v).unwrap()
    }

    fn predicate() -> FilterPredicate {
        FilterPredicate::new(
            vec!["fullName".to_string(), "email".to_string()],
            Some(CategoryField::Field("loanType".to_string())),
            StatusPolicy::new(["Pending", "Approved", "Rejected"]),
        )
    }

    fn filter(search: &str, status: &str, category: &str) -> FilterState {
        FilterState {
            search_text: search.to_string(),
            status_filter: status.to_string(),
            category_filter: category.to_string(),
        }
    }

    #[test]
    fn status_filter_selects_exact_status() {
        let items = vec![
            record(json!({"id": 1, "status": "Pending"})),
            record(json!({"id": 2, "status": "Approved"})),
        ];
        let out = predicate().apply(&items, &filter("", "Pending", ALL));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), &EntityId::Number(1));
    }

    #[test]
    fn default_filter_matches_everything() {
        let r = record(json!({"id": 1}));
        assert!(FilterState::default().is_unrestricted());
        assert!(predicate().matches(&r, &FilterState::default()));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let r = record(json!({"id": 1, "fullName": "Meera Nair", "email": "meera@x.in"}));
        assert!(predicate().matches(&r, &filter("NAIR", ALL, ALL)));
        assert!(predicate().matches(&r, &filter("  x.in ", ALL, ALL)));
        assert!(!predicate().matches(&r, &filter("kumar", ALL, ALL)));
    }

    #[test]
    fn search_matches_id() {
        let r = record(json!({"_id": "LN-77"}));
        assert!(predicate().matches(&r, &filter("ln-7", ALL, ALL)));
    }

    #[test]
    fn missing_fields_never_match_search_or_filters() {
        let r = record(json!({"id": 1}));
        assert!(!predicate().matches(&r, &filter("meera", ALL, ALL)));
        assert!(!predicate().matches(&r, &filter("", "Pending", ALL)));
        assert!(!predicate().matches(&r, &filter("", ALL, "Home")));
    }

    #[test]
    fn conditions_are_anded() {
        let r = record(json!({"id": 1, "fullName": "Meera", "status": "Approved", "loanType": "Home"}));
        assert!(predicate().matches(&r, &filter("meera", "Approved", "Home")));
        assert!(!predicate().matches(&r, &filter("meera", "Approved", "Personal")));
        assert!(!predicate().matches(&r, &filter("meera", "Rejected", "Home")));
    }

    #[test]
    fn category_aliases_map_raw_values() {
        let mut p = predicate();
        p.category_aliases.insert("home_loan".to_string(), "Home".to_string());
        let r = record(json!({"id": 1, "loanType": "home_loan"}));
        assert!(p.matches(&r, &filter("", ALL, "Home")));
    }

    #[test]
    fn source_category_reads_record_source() {
        let p = FilterPredicate::new(
            vec![],
            Some(CategoryField::Source),
            StatusPolicy::new(["pending"]),
        );
        let mut r = record(json!({"id": 1}));
        assert!(!p.matches(&r, &filter("", ALL, "contact")));
        r.tag_source("contact");
        assert!(p.matches(&r, &filter("", ALL, "contact")));
    }

    #[test]
    fn all_is_case_insensitive_and_blank_means_all() {
        let r = record(json!({"id": 1, "status": "Pending"}));
        assert!(predicate().matches(&r, &filter("", "ALL", "")));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: evaluating the predicate twice yields the same answer and
        /// leaves both the entity and the filter untouched.
        #[test]
        fn matches_is_pure(
            name in "[a-zA-Z ]{0,12}",
            search in "[a-zA-Z]{0,4}",
            status in prop::sample::select(vec!["Pending", "Approved", "Rejected", "all"]),
        ) {
            let r = record(json!({"id": 1, "fullName": name, "status": "Pending"}));
            let before = r.clone();
            let f = filter(&search, status, ALL);
            let f_before = f.clone();

            let first = predicate().matches(&r, &f);
            let second = predicate().matches(&r, &f);

            prop_assert_eq!(first, second);
            prop_assert_eq!(r, before);
            prop_assert_eq!(f, f_before);
        }
    }
}
