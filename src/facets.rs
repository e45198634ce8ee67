//! Derived sidebar aggregates: folder set and tag occurrence counts.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::store::{Photo, PhotoStore};

/// Aggregates driving the filter sidebar. Fully derived from the
/// collection; never a source of truth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetSummary {
    /// Sorted distinct directory prefixes found in record paths.
    pub folders: Vec<String>,
    /// Tag -> number of records currently holding it. Case-sensitive.
    pub tag_counts: BTreeMap<String, usize>,
}

/// Directory prefix of a relative path: everything before the final
/// `/`. Paths without a separator have no folder.
pub fn folder_of(path: &str) -> Option<&str> {
    path.rfind('/').map(|idx| &path[..idx])
}

/// Recompute the facet summary from the current records. Costs
/// O(total tags + records); see [`FacetCache`] for memoization.
pub fn compute_facets(records: &[Arc<Photo>]) -> FacetSummary {
    let mut folders = BTreeSet::new();
    let mut tag_counts: BTreeMap<String, usize> = BTreeMap::new();

    for photo in records {
        if let Some(folder) = folder_of(&photo.metadata.path) {
            if !folders.contains(folder) {
                folders.insert(folder.to_string());
            }
        }
        for tag in &photo.tags {
            *tag_counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }

    FacetSummary {
        folders: folders.into_iter().collect(),
        tag_counts,
    }
}

/// Memoizes the last computed summary against the store revision.
/// Correctness never depends on the cache; it only skips recomputation
/// while the store has not changed.
#[derive(Default)]
pub struct FacetCache {
    revision: Option<u64>,
    summary: FacetSummary,
}

impl FacetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&mut self, store: &PhotoStore) -> &FacetSummary {
        let revision = store.revision();
        if self.revision != Some(revision) {
            self.summary = compute_facets(store.records());
            self.revision = Some(revision);
        }
        &self.summary
    }
}
