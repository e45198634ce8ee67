//! Folder import: discovery, metadata extraction and record creation.

pub mod discovery;
pub mod metadata;

use anyhow::Result;
use std::path::Path;

use crate::config::ImportConfig;
use crate::store::Photo;

pub use discovery::discover_images;
pub use metadata::extract_metadata;

/// Relative path of `file` under `root`, `/`-separated on every
/// platform. Files directly under the root keep just their filename.
fn relative_path(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    segments.join("/")
}

/// Import every image under `root` as a batch of fresh records.
///
/// Metadata extraction is total for the batch: a single unreadable
/// file is logged and skipped, never aborting its siblings.
pub fn import_directory(root: &Path, config: &ImportConfig) -> Result<Vec<Photo>> {
    let paths = discover_images(root, &config.image_extensions)?;

    let mut photos = Vec::with_capacity(paths.len());
    for path in paths {
        let relative = relative_path(root, &path);
        match extract_metadata(&path, &relative) {
            Ok(meta) => photos.push(Photo::new(path, meta)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping file during import");
            }
        }
    }

    tracing::info!(root = %root.display(), count = photos.len(), "Imported directory");
    Ok(photos)
}
