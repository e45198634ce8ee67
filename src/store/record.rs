use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Unique identifier for a photo record, stable for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhotoId(pub u64);

impl PhotoId {
    /// Allocate the next id from a global monotonic counter.
    pub fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        PhotoId(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

/// Immutable file metadata captured at import time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoMetadata {
    pub filename: String,
    /// Relative path from the import root, `/`-separated on every
    /// platform. Files at the import root keep just their filename,
    /// so the path is never empty.
    pub path: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub modified_at: Option<DateTime<Utc>>,
    /// Pixel dimensions (width, height); `None` when probing failed.
    pub dimensions: Option<(u32, u32)>,
}

/// One imported photo and its user- and AI-derived state.
#[derive(Debug, Clone)]
pub struct Photo {
    pub id: PhotoId,
    /// Absolute on-disk location, used for previews and analysis payloads.
    pub source: PathBuf,
    pub metadata: PhotoMetadata,
    /// 0-5, where 0 means unrated.
    pub rating: u8,
    /// Insertion-ordered for display, semantically a set: no
    /// duplicates, case-sensitive.
    pub tags: Vec<String>,
    pub ai_description: Option<String>,
    /// True only while an analysis call for this record is outstanding.
    pub is_analyzing: bool,
}

impl Photo {
    pub fn new(source: PathBuf, metadata: PhotoMetadata) -> Self {
        Self {
            id: PhotoId::next(),
            source,
            metadata,
            rating: 0,
            tags: Vec::new(),
            ai_description: None,
            is_analyzing: false,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_ids_are_unique() {
        let meta = PhotoMetadata {
            filename: "a.jpg".to_string(),
            path: "a.jpg".to_string(),
            size_bytes: 0,
            mime_type: "image/jpeg".to_string(),
            modified_at: None,
            dimensions: None,
        };
        let a = Photo::new(PathBuf::from("/tmp/a.jpg"), meta.clone());
        let b = Photo::new(PathBuf::from("/tmp/a.jpg"), meta);
        assert_ne!(a.id, b.id);
    }
}
