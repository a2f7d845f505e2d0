// Batch resolution pipeline
//
// Files are discovered and chunked into fixed-size batches; each batch is
// resolved to cached metadata across a worker pool, unresolved files go to
// the classification oracle, and the resolved records feed enrichment,
// thumbnails and the manifest.

pub mod discover;
pub mod existence;
pub mod pipeline;
pub mod resolver;

#[cfg(test)]
#[path = "tests.rs"]
mod tests;

use std::path::{Path, PathBuf};

use crate::constants::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::db::schema::Post;
use crate::error::{BooruError, Result};

/// Format class of a media file, immutable for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatClass {
    Image,
    Video,
}

/// A discovered media file plus the root it was found under (relative paths
/// in the manifest are computed against that root).
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    pub root: PathBuf,
    pub format: FormatClass,
}

impl MediaFile {
    pub fn new(path: PathBuf, root: PathBuf) -> Option<Self> {
        let format = classify_extension(&path)?;
        Some(Self { path, root, format })
    }

    /// Path relative to the discovery root.
    pub fn relative_path(&self) -> Result<&Path> {
        self.path
            .strip_prefix(&self.root)
            .map_err(|_| BooruError::InvalidPath(self.path.display().to_string()))
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Classify a path by extension; None when the file is not importable media.
pub fn classify_extension(path: &Path) -> Option<FormatClass> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(FormatClass::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(FormatClass::Video)
    } else {
        None
    }
}

/// Outcome of the external catalog existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    Absent,
    Present,
    Error,
}

/// The unit produced by the batch resolver for one input file.
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    pub file: MediaFile,
    pub post: Post,
    pub md5: String,
    pub pixel_hash: String,
    pub existence: Existence,
    /// True when the post has never been classified and should go to the
    /// oracle.
    pub needs_classification: bool,
}
