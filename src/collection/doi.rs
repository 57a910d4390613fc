//! DOI categorization and membership diffing

use serde::Serialize;
use std::collections::HashSet;

use crate::core::model::{DataSource, DoiEntry};

/// DOIs split by where they are catalogued, first occurrence order kept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorizedDois {
    pub internal: Vec<String>,
    pub external: Vec<String>,
}

impl CategorizedDois {
    pub fn is_empty(&self) -> bool {
        self.internal.is_empty() && self.external.is_empty()
    }

    /// All DOIs as entries, internal ones first
    pub fn into_entries(self) -> Vec<DoiEntry> {
        self.internal
            .into_iter()
            .map(DoiEntry::internal)
            .chain(self.external.into_iter().map(DoiEntry::external))
            .collect()
    }
}

/// Classify a single DOI against the internal catalog prefix
pub fn datasource_of(prefix: &str, doi: &str) -> DataSource {
    match doi.strip_prefix(prefix) {
        Some(rest) if rest.starts_with('/') => DataSource::Internal,
        _ => DataSource::External,
    }
}

/// De-duplicate `dois` (first occurrence wins) and partition them into
/// internal and external by exact `"<prefix>/"` match
///
/// # Examples
///
/// ```
/// use collection_publisher::collection::categorize_dois;
///
/// let dois = ["10.1111/A", "10.1111/B", "10.9999/X", "10.1111/A"].map(String::from);
/// let categorized = categorize_dois("10.1111", &dois);
///
/// assert_eq!(categorized.internal, ["10.1111/A", "10.1111/B"]);
/// assert_eq!(categorized.external, ["10.9999/X"]);
/// ```
pub fn categorize_dois(prefix: &str, dois: &[String]) -> CategorizedDois {
    let mut seen = HashSet::new();
    let mut categorized = CategorizedDois::default();

    for doi in dois {
        if !seen.insert(doi.as_str()) {
            continue;
        }
        match datasource_of(prefix, doi) {
            DataSource::Internal => categorized.internal.push(doi.clone()),
            DataSource::External => categorized.external.push(doi.clone()),
        }
    }

    categorized
}

/// Result of applying an add/remove request to a membership list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MembershipDiff {
    /// The new ordered membership
    pub entries: Vec<DoiEntry>,
    /// DOIs actually appended
    pub added: Vec<String>,
    /// DOIs actually dropped
    pub removed: Vec<String>,
}

impl MembershipDiff {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Apply removals then additions to `current`
///
/// Removing an absent DOI and adding a present one are both silently ignored.
/// `add` is expected to hold only internal DOIs; policy checks happen before.
pub fn diff_membership(current: &[DoiEntry], add: &[String], remove: &[String]) -> MembershipDiff {
    let remove: HashSet<&str> = remove.iter().map(String::as_str).collect();

    let mut removed = Vec::new();
    let mut entries: Vec<DoiEntry> = Vec::with_capacity(current.len() + add.len());
    for entry in current {
        if remove.contains(entry.value.as_str()) {
            removed.push(entry.value.clone());
        } else {
            entries.push(entry.clone());
        }
    }

    let mut present: HashSet<String> = entries.iter().map(|e| e.value.clone()).collect();
    let mut added = Vec::new();
    for doi in add {
        if present.insert(doi.clone()) {
            entries.push(DoiEntry::internal(doi.clone()));
            added.push(doi.clone());
        }
    }

    MembershipDiff {
        entries,
        added,
        removed,
    }
}
