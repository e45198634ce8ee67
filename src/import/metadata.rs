use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

use crate::store::PhotoMetadata;

/// MIME type for a file based on its extension.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

/// Extract the immutable metadata snapshot for one file.
///
/// The dimension probe is best-effort: a file the `image` crate cannot
/// parse still imports, with `dimensions` left empty. Only a failing
/// stat makes the file unimportable.
pub fn extract_metadata(path: &Path, relative_path: &str) -> Result<PhotoMetadata> {
    let fs_meta = std::fs::metadata(path)
        .with_context(|| format!("Failed to read file metadata for {}", path.display()))?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let modified_at = fs_meta.modified().ok().map(DateTime::<Utc>::from);

    // Header-only read; does not decode the full image.
    let dimensions = image::ImageReader::open(path)
        .ok()
        .and_then(|reader| reader.into_dimensions().ok());

    let path_str = if relative_path.is_empty() {
        filename.clone()
    } else {
        relative_path.to_string()
    };

    Ok(PhotoMetadata {
        filename,
        path: path_str,
        size_bytes: fs_meta.len(),
        mime_type: mime_type_for(path).to_string(),
        modified_at,
        dimensions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_mime_type_for() {
        assert_eq!(mime_type_for(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("a.png")), "image/png");
        assert_eq!(mime_type_for(Path::new("a.xyz")), "application/octet-stream");
    }

    #[test]
    fn test_extract_metadata_degrades_without_dimensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"not an image").unwrap();

        let meta = extract_metadata(&path, "broken.jpg").unwrap();
        assert_eq!(meta.filename, "broken.jpg");
        assert_eq!(meta.size_bytes, 12);
        assert_eq!(meta.mime_type, "image/jpeg");
        assert!(meta.dimensions.is_none());
        assert!(meta.modified_at.is_some());
    }

    #[test]
    fn test_extract_metadata_reads_dimensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        image::RgbImage::new(4, 2).save(&path).unwrap();

        let meta = extract_metadata(&path, "tiny.png").unwrap();
        assert_eq!(meta.dimensions, Some((4, 2)));
    }

    #[test]
    fn test_extract_metadata_fails_on_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.jpg");
        assert!(extract_metadata(&path, "gone.jpg").is_err());
    }

    #[test]
    fn test_extract_metadata_falls_back_to_filename() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("root.jpg");
        fs::write(&path, b"x").unwrap();

        let meta = extract_metadata(&path, "").unwrap();
        assert_eq!(meta.path, "root.jpg");
    }
}
