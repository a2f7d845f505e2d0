// External tool resolver for ffmpeg/ffprobe/magick/php
//
// Resolution order:
// 1) Environment variable override (BOORUBATCH_FFMPEG_PATH, etc.)
// 2) Sidecar next to the executable
// 3) PATH fallback

use std::env;
use std::path::PathBuf;

/// Get the directory containing the current executable
fn exe_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
}

/// Resolve an external tool path.
fn resolve_tool(env_key: &str, default_name: &str) -> PathBuf {
    // 1) Check environment variable override
    if let Ok(v) = env::var(env_key) {
        let p = PathBuf::from(&v);
        if p.exists() {
            return p;
        }
    }

    // Add .exe on Windows
    let mut filename = default_name.to_string();
    if cfg!(windows) && !filename.to_lowercase().ends_with(".exe") {
        filename.push_str(".exe");
    }

    // 2) Check sidecar next to executable
    if let Some(dir) = exe_dir() {
        let candidate = dir.join(&filename);
        if candidate.exists() {
            return candidate;
        }
    }

    // 3) Fall back to PATH
    PathBuf::from(default_name)
}

/// Get path to ffprobe binary
pub fn ffprobe_path() -> PathBuf {
    resolve_tool("BOORUBATCH_FFPROBE_PATH", "ffprobe")
}

/// Get path to ffmpeg binary
pub fn ffmpeg_path() -> PathBuf {
    resolve_tool("BOORUBATCH_FFMPEG_PATH", "ffmpeg")
}

/// Get path to ImageMagick binary
pub fn magick_path() -> PathBuf {
    resolve_tool("BOORUBATCH_MAGICK_PATH", "magick")
}

/// Get path to the PHP interpreter used for catalog existence checks
pub fn php_path() -> PathBuf {
    resolve_tool("BOORUBATCH_PHP_PATH", "php")
}
