// Media dimension probing
//
// Image dimensions come from the file header without a full decode; video
// dimensions go through ffprobe. The enrichment pipeline takes dimensions as
// an input so it stays a pure function of its arguments.

pub mod ffprobe;

use std::path::Path;

use log::warn;

use crate::ingest::FormatClass;

/// Probe the pixel dimensions of a media file. Returns None when probing
/// fails; resolution tags are simply omitted for that file.
pub fn probe_dimensions(path: &Path, format: FormatClass) -> Option<(u32, u32)> {
    match format {
        FormatClass::Image => match image::image_dimensions(path) {
            Ok(dims) => Some(dims),
            Err(e) => {
                warn!("Failed to read dimensions of {}: {}", path.display(), e);
                None
            }
        },
        FormatClass::Video => match ffprobe::probe_resolution(path) {
            Ok(dims) => Some(dims),
            Err(e) => {
                warn!("Failed to probe resolution of {}: {}", path.display(), e);
                None
            }
        },
    }
}
