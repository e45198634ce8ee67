//! In-memory photo collection and its mutation surface.

pub mod record;

use std::collections::HashMap;
use std::sync::Arc;

pub use record::{Photo, PhotoId, PhotoMetadata};

use crate::analysis::AnalysisResult;

/// Ordered, authoritative collection of photo records.
///
/// Every mutation is a whole-record replacement: the affected `Photo`
/// is cloned, modified and swapped in behind a fresh `Arc`. Snapshots
/// handed out earlier keep pointing at the old record, so readers
/// never observe a partially mutated one. The revision counter moves
/// only on effective changes, which lets derived views cache against
/// it.
pub struct PhotoStore {
    records: Vec<Arc<Photo>>,
    index: HashMap<PhotoId, usize>,
    revision: u64,
}

impl PhotoStore {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            revision: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Monotonic counter bumped on every effective mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn records(&self) -> &[Arc<Photo>] {
        &self.records
    }

    /// Cheap point-in-time view of the collection.
    pub fn snapshot(&self) -> Vec<Arc<Photo>> {
        self.records.clone()
    }

    pub fn get(&self, id: PhotoId) -> Option<&Arc<Photo>> {
        self.index.get(&id).map(|&slot| &self.records[slot])
    }

    /// Append a batch of freshly imported records, preserving existing
    /// order. Ids must be unique (guaranteed by the `PhotoId` counter).
    /// The revision moves once per non-empty batch, so a reader never
    /// sees a half-appended batch.
    pub fn append(&mut self, records: Vec<Photo>) {
        if records.is_empty() {
            return;
        }
        for photo in records {
            debug_assert!(
                !self.index.contains_key(&photo.id),
                "photo id collision in append"
            );
            self.index.insert(photo.id, self.records.len());
            self.records.push(Arc::new(photo));
        }
        self.revision += 1;
    }

    /// Replace the rating. Silent no-op on unknown id. The value is
    /// not range-checked here; callers hand in 0-5.
    pub fn update_rating(&mut self, id: PhotoId, rating: u8) {
        self.replace(id, |photo| {
            if photo.rating == rating {
                return false;
            }
            photo.rating = rating;
            true
        });
    }

    /// Add a tag with set semantics: no-op on unknown id or when the
    /// tag is already present.
    pub fn add_tag(&mut self, id: PhotoId, tag: &str) {
        self.replace(id, |photo| {
            if photo.has_tag(tag) {
                return false;
            }
            photo.tags.push(tag.to_string());
            true
        });
    }

    /// Remove a tag; no-op when absent.
    pub fn remove_tag(&mut self, id: PhotoId, tag: &str) {
        self.replace(id, |photo| {
            let before = photo.tags.len();
            photo.tags.retain(|t| t != tag);
            photo.tags.len() != before
        });
    }

    /// Merge an analysis result into the record: tags are unioned
    /// (existing order kept, new tags appended in response order), the
    /// description is set, and the suggested rating is taken only
    /// while the record is still unrated. Clears the analyzing flag.
    pub fn apply_analysis_result(&mut self, id: PhotoId, result: &AnalysisResult) {
        self.replace(id, |photo| {
            for tag in &result.tags {
                if !photo.has_tag(tag) {
                    photo.tags.push(tag.clone());
                }
            }
            photo.ai_description = Some(result.description.clone());
            if photo.rating == 0 {
                photo.rating = result.rating_suggestion;
            }
            photo.is_analyzing = false;
            true
        });
    }

    /// Set the transient in-flight flag for one record.
    pub fn set_analyzing(&mut self, id: PhotoId, flag: bool) {
        self.replace(id, |photo| {
            if photo.is_analyzing == flag {
                return false;
            }
            photo.is_analyzing = flag;
            true
        });
    }

    /// Copy-on-write mutation: clone the record, apply `mutate`, and
    /// swap the clone in only when it reports an effective change.
    fn replace<F>(&mut self, id: PhotoId, mutate: F)
    where
        F: FnOnce(&mut Photo) -> bool,
    {
        let slot = match self.index.get(&id) {
            Some(&slot) => slot,
            None => return,
        };
        let mut updated = (*self.records[slot]).clone();
        if mutate(&mut updated) {
            self.records[slot] = Arc::new(updated);
            self.revision += 1;
        }
    }
}

impl Default for PhotoStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn photo(path: &str) -> Photo {
        let filename = path.rsplit('/').next().unwrap_or(path).to_string();
        Photo::new(
            PathBuf::from("/pictures").join(path),
            PhotoMetadata {
                filename,
                path: path.to_string(),
                size_bytes: 1024,
                mime_type: "image/jpeg".to_string(),
                modified_at: None,
                dimensions: Some((640, 480)),
            },
        )
    }

    fn result(tags: &[&str], rating: u8) -> AnalysisResult {
        AnalysisResult {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            description: "A test photo".to_string(),
            rating_suggestion: rating,
        }
    }

    #[test]
    fn test_append_preserves_order() {
        let mut store = PhotoStore::new();
        let photos = vec![photo("A/1.jpg"), photo("A/2.jpg"), photo("B/3.jpg")];
        let ids: Vec<PhotoId> = photos.iter().map(|p| p.id).collect();
        store.append(photos);
        store.append(vec![photo("C/4.jpg")]);

        assert_eq!(store.len(), 4);
        let stored: Vec<PhotoId> = store.records().iter().map(|p| p.id).collect();
        assert_eq!(&stored[..3], &ids[..]);
        for id in ids {
            assert!(store.get(id).is_some());
        }
    }

    #[test]
    fn test_add_remove_tag_round_trip() {
        let mut store = PhotoStore::new();
        let p = photo("a.jpg");
        let id = p.id;
        store.append(vec![p]);
        store.add_tag(id, "sunset");

        let original = store.get(id).unwrap().tags.clone();
        store.add_tag(id, "beach");
        store.remove_tag(id, "beach");
        assert_eq!(store.get(id).unwrap().tags, original);
    }

    #[test]
    fn test_add_tag_is_idempotent() {
        let mut store = PhotoStore::new();
        let p = photo("a.jpg");
        let id = p.id;
        store.append(vec![p]);

        store.add_tag(id, "sunset");
        let rev = store.revision();
        store.add_tag(id, "sunset");

        assert_eq!(store.get(id).unwrap().tags, vec!["sunset".to_string()]);
        // A no-op must not invalidate caches keyed on the revision.
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn test_remove_absent_tag_is_noop() {
        let mut store = PhotoStore::new();
        let p = photo("a.jpg");
        let id = p.id;
        store.append(vec![p]);
        let rev = store.revision();
        store.remove_tag(id, "missing");
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn test_mutations_on_unknown_id_are_silent() {
        let mut store = PhotoStore::new();
        store.append(vec![photo("a.jpg")]);
        let rev = store.revision();

        let ghost = PhotoId::next();
        store.update_rating(ghost, 5);
        store.add_tag(ghost, "sunset");
        store.remove_tag(ghost, "sunset");
        store.set_analyzing(ghost, true);
        store.apply_analysis_result(ghost, &result(&["sunset"], 4));

        assert_eq!(store.len(), 1);
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn test_analysis_merge_keeps_user_rating() {
        let mut store = PhotoStore::new();
        let p = photo("a.jpg");
        let id = p.id;
        store.append(vec![p]);

        store.update_rating(id, 4);
        store.apply_analysis_result(id, &result(&["sunset"], 2));
        assert_eq!(store.get(id).unwrap().rating, 4);
    }

    #[test]
    fn test_analysis_merge_fills_unrated() {
        let mut store = PhotoStore::new();
        let p = photo("a.jpg");
        let id = p.id;
        store.append(vec![p]);

        store.apply_analysis_result(id, &result(&["sunset"], 5));
        assert_eq!(store.get(id).unwrap().rating, 5);
    }

    #[test]
    fn test_analysis_merge_unions_tags_and_clears_flag() {
        let mut store = PhotoStore::new();
        let p = photo("a.jpg");
        let id = p.id;
        store.append(vec![p]);

        store.add_tag(id, "sunset");
        store.set_analyzing(id, true);
        store.apply_analysis_result(id, &result(&["beach", "sunset", "people"], 3));

        let merged = store.get(id).unwrap();
        assert_eq!(
            merged.tags,
            vec![
                "sunset".to_string(),
                "beach".to_string(),
                "people".to_string()
            ]
        );
        assert_eq!(merged.ai_description.as_deref(), Some("A test photo"));
        assert!(!merged.is_analyzing);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_mutation() {
        let mut store = PhotoStore::new();
        let p = photo("a.jpg");
        let id = p.id;
        store.append(vec![p]);

        let snapshot = store.snapshot();
        store.add_tag(id, "sunset");

        assert!(snapshot[0].tags.is_empty());
        assert_eq!(store.get(id).unwrap().tags.len(), 1);
    }
}
