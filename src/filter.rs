//! Multi-criteria filtering of the photo collection.

use std::sync::Arc;

use crate::store::Photo;

/// The active combination of filter constraints. Every field at its
/// default means "no restriction"; active sub-predicates are combined
/// with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    /// Literal prefix match against the record's relative path.
    pub folder_prefix: Option<String>,
    /// Every listed tag must be present (AND, not OR).
    pub required_tags: Vec<String>,
    /// Minimum rating; 0 disables the predicate.
    pub min_rating: u8,
    /// Case-insensitive substring match on filename or any tag.
    pub search_text: String,
}

impl FilterCriteria {
    pub fn is_unrestricted(&self) -> bool {
        self.folder_prefix.is_none()
            && self.required_tags.is_empty()
            && self.min_rating == 0
            && self.search_text.is_empty()
    }
}

/// Whether a single record satisfies all active criteria.
pub fn matches(photo: &Photo, criteria: &FilterCriteria) -> bool {
    if let Some(prefix) = &criteria.folder_prefix {
        // Literal prefix test, not segment-aware: "ab" also matches
        // "abc/x.jpg".
        if !photo.metadata.path.starts_with(prefix.as_str()) {
            return false;
        }
    }

    if photo.rating < criteria.min_rating {
        return false;
    }

    if !criteria.required_tags.iter().all(|t| photo.has_tag(t)) {
        return false;
    }

    if !criteria.search_text.is_empty() {
        let query = criteria.search_text.to_lowercase();
        let matches_name = photo.metadata.filename.to_lowercase().contains(&query);
        let matches_tag = photo.tags.iter().any(|t| t.to_lowercase().contains(&query));
        if !matches_name && !matches_tag {
            return false;
        }
    }

    true
}

/// Stable filter over the collection: the store's relative order is
/// preserved and nothing is re-sorted.
pub fn filter_photos(records: &[Arc<Photo>], criteria: &FilterCriteria) -> Vec<Arc<Photo>> {
    records
        .iter()
        .filter(|photo| matches(photo, criteria))
        .cloned()
        .collect()
}
