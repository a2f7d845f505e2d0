// FFprobe wrapper for video stream metadata

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::error::{BooruError, Result};

#[derive(Debug, Deserialize)]
struct FFprobeOutput {
    streams: Option<Vec<FFprobeStream>>,
}

#[derive(Debug, Deserialize)]
struct FFprobeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Extract the resolution of the first video stream via ffprobe.
pub fn probe_resolution(path: &Path) -> Result<(u32, u32)> {
    let output = Command::new(crate::tools::ffprobe_path())
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height",
            "-print_format", "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| BooruError::FFprobe(format!("Failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BooruError::FFprobe(format!(
            "ffprobe failed for {}: {}",
            path.display(),
            stderr.trim()
        )));
    }

    let probe: FFprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| BooruError::FFprobe(format!("Failed to parse ffprobe output: {}", e)))?;

    probe
        .streams
        .unwrap_or_default()
        .into_iter()
        .find_map(|s| match (s.width, s.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        })
        .ok_or_else(|| {
            BooruError::FFprobe(format!("No video stream with dimensions in {}", path.display()))
        })
}
