// Media discovery
//
// Recursive walk of the image root (and optional video root), filtered by
// extension, skipping generated thumbnails, sorted for a deterministic batch
// order.

use std::path::Path;

use log::{debug, warn};
use walkdir::WalkDir;

use crate::constants::THUMBNAILS_FOLDER;
use crate::ingest::MediaFile;

/// Discover importable media under the given roots. Anything under a
/// `thumbnails/` directory is a generated artifact and is never imported.
/// Unreadable entries are logged and walked past; every readable file is
/// still discovered.
pub fn discover_media(image_root: &Path, video_root: Option<&Path>) -> Vec<MediaFile> {
    let mut files = Vec::new();

    collect_root(image_root, &mut files);
    if let Some(root) = video_root {
        collect_root(root, &mut files);
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!("Discovered {} media files", files.len());
    files
}

fn collect_root(root: &Path, out: &mut Vec<MediaFile>) {
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if under_thumbnails(path, root) {
            continue;
        }

        if let Some(file) = MediaFile::new(path.to_path_buf(), root.to_path_buf()) {
            out.push(file);
        }
    }
}

fn under_thumbnails(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root)
        .map(|rel| {
            rel.components()
                .any(|c| c.as_os_str() == THUMBNAILS_FOLDER)
        })
        .unwrap_or(false)
}

/// Split the sorted file list into fixed-size batches.
pub fn chunk_batches(files: Vec<MediaFile>, batch_size: usize) -> Vec<Vec<MediaFile>> {
    let size = batch_size.max(1);
    let mut batches = Vec::with_capacity(files.len().div_ceil(size));
    let mut current = Vec::with_capacity(size);
    for file in files {
        current.push(file);
        if current.len() == size {
            batches.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
