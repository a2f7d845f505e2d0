// Thumbnail codecs
//
// Images go through ImageMagick (lossy WebP at the configured quality) with
// an in-process decode fallback when magick is unavailable or chokes on the
// input. Videos get their first representative frame through ffmpeg. Both
// paths write to a temp file and rename into place so a killed run never
// leaves a truncated thumbnail behind.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::warn;

use crate::constants::{THUMB_FORMAT, THUMB_LONG_EDGE, THUMB_QUALITY};
use crate::error::{BooruError, Result};

fn tmp_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    dest.with_file_name(name)
}

fn ensure_parent(dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn commit(tmp: &Path, dest: &Path) -> Result<()> {
    let size = std::fs::metadata(tmp)?.len();
    if size == 0 {
        let _ = std::fs::remove_file(tmp);
        return Err(BooruError::Thumbnail(format!(
            "Empty thumbnail output for {}",
            dest.display()
        )));
    }
    std::fs::rename(tmp, dest)?;
    Ok(())
}

/// Resize an image to the thumbnail bounding box. ImageMagick first, then an
/// in-process decode if magick failed.
pub fn generate_image_thumb(source: &Path, dest: &Path) -> Result<()> {
    ensure_parent(dest)?;
    match magick_resize(source, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(
                "ImageMagick failed for {} ({}), using in-process fallback",
                source.display(),
                e
            );
            fallback_image_thumb(source, dest)
        }
    }
}

fn magick_resize(source: &Path, dest: &Path) -> Result<()> {
    let tmp = tmp_path(dest);
    // The `>` flag only shrinks; smaller images pass through untouched
    let geometry = format!("{0}x{0}>", THUMB_LONG_EDGE);

    let output = Command::new(crate::tools::magick_path())
        .arg(source)
        .args(["-resize", &geometry, "-quality", &THUMB_QUALITY.to_string()])
        .arg(format!("{}:{}", THUMB_FORMAT, tmp.display()))
        .output()
        .map_err(|e| BooruError::Thumbnail(format!("Failed to run magick: {}", e)))?;

    if !output.status.success() {
        let _ = std::fs::remove_file(&tmp);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BooruError::Thumbnail(format!(
            "magick exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    commit(&tmp, dest)
}

/// Decode and resize with the image crate. The WebP it writes is lossless,
/// larger than the magick output but valid.
fn fallback_image_thumb(source: &Path, dest: &Path) -> Result<()> {
    ensure_parent(dest)?;
    let img = image::open(source).map_err(|e| BooruError::Decode {
        path: source.display().to_string(),
        reason: e.to_string(),
    })?;
    let thumb = img.thumbnail(THUMB_LONG_EDGE, THUMB_LONG_EDGE);

    let tmp = tmp_path(dest);
    thumb
        .save_with_format(&tmp, image::ImageFormat::WebP)
        .map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            BooruError::Thumbnail(format!(
                "Fallback encode failed for {}: {}",
                source.display(),
                e
            ))
        })?;

    commit(&tmp, dest)
}

/// Extract one representative frame from a video, scaled into the thumbnail
/// bounding box.
pub fn generate_video_thumb(source: &Path, dest: &Path) -> Result<()> {
    ensure_parent(dest)?;
    let tmp = tmp_path(dest);
    let filter = format!(
        "thumbnail,scale={0}:{0}:force_original_aspect_ratio=decrease",
        THUMB_LONG_EDGE
    );

    let output = Command::new(crate::tools::ffmpeg_path())
        .args(["-y", "-i"])
        .arg(source)
        .args([
            "-vf",
            &filter,
            "-frames:v",
            "1",
            "-f",
            THUMB_FORMAT,
            "-quality",
            &THUMB_QUALITY.to_string(),
        ])
        .arg(&tmp)
        .output()
        .map_err(|e| BooruError::FFmpeg(format!("Failed to run ffmpeg: {}", e)))?;

    if !output.status.success() {
        let _ = std::fs::remove_file(&tmp);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BooruError::FFmpeg(format!(
            "ffmpeg exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    commit(&tmp, dest)
}
